/// Builds hierarchical property keys such as `Detail\k1\used` while the
/// flattener walks a nested value.
///
/// Every [`append`](Self::append) pushes a mark; [`pop_level`](Self::pop_level)
/// truncates back to the most recent one. Tokens that contain the path
/// delimiter have it replaced so a key always splits back into the tokens
/// that built it.
///
/// # Examples
///
/// ```
/// use streamx_core::flatten::PropertyNameBuilder;
///
/// let mut name = PropertyNameBuilder::new("Detail", "\\", "!");
/// name.append("k1").append("used");
/// assert_eq!(name.as_str(), "Detail\\k1\\used");
/// name.pop_level();
/// assert_eq!(name.prop_string(), "Detail\\k1");
/// assert_eq!(name.as_str(), "Detail");
///
/// name.append("a\\b");
/// assert_eq!(name.as_str(), "Detail\\a!b");
/// ```
#[derive(Debug, Clone)]
pub struct PropertyNameBuilder {
    buf: String,
    marks: Vec<usize>,
    delimiter: String,
    replacement: String,
}

impl PropertyNameBuilder {
    pub fn new(initial: &str, delimiter: impl Into<String>, replacement: impl Into<String>) -> Self {
        let mut builder = Self {
            buf: String::new(),
            marks: Vec::new(),
            delimiter: delimiter.into(),
            replacement: replacement.into(),
        };
        builder.reset(initial);
        builder
    }

    /// Clears every level and starts over from `initial`.
    pub fn reset(&mut self, initial: &str) {
        self.buf.clear();
        self.marks.clear();
        self.push_escaped(initial);
    }

    /// Appends `delimiter + token` as a new level.
    pub fn append(&mut self, token: &str) -> &mut Self {
        self.marks.push(self.buf.len());
        self.buf.push_str(&self.delimiter);
        self.push_escaped(token);
        self
    }

    /// Removes the most recent level. A no-op at the initial name.
    pub fn pop_level(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.buf.truncate(mark);
        }
    }

    /// Returns the current key and pops one level.
    pub fn prop_string(&mut self) -> String {
        let current = self.buf.clone();
        self.pop_level();
        current
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Number of levels above the initial name.
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    fn push_escaped(&mut self, token: &str) {
        if token.contains(self.delimiter.as_str()) {
            self.buf
                .push_str(&token.replace(self.delimiter.as_str(), &self.replacement));
        } else {
            self.buf.push_str(token);
        }
    }
}
