use crate::value::AttrValue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// One flat, path-keyed property of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: String,
    pub value: AttrValue,
    /// Transient properties describe the snapshot itself and are not meant
    /// to be persisted by publishers.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub transient: bool,
}

/// Flat property bag produced for one resource in one sampling cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    category: String,
    name: String,
    timestamp: DateTime<Utc>,
    properties: Vec<Property>,
}

impl Snapshot {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            timestamp: Utc::now(),
            properties: Vec::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.properties.push(Property {
            key: key.into(),
            value: value.into(),
            transient: false,
        });
    }

    pub fn add_transient(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.properties.push(Property {
            key: key.into(),
            value: value.into(),
            transient: true,
        });
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.properties.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    pub fn get_ignore_case(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key.eq_ignore_ascii_case(key))
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Drops every property after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.properties.truncate(len);
    }

    /// Makes every property key unique.
    ///
    /// A key that is also a branch of another key (`a` next to `a\b`) gets
    /// `suffix` appended so both the leaf and the branch survive. Exact
    /// duplicates get the suffix repeated until they no longer clash.
    /// Returns the number of renamed keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use streamx_common::snapshot::Snapshot;
    ///
    /// let mut snap = Snapshot::new("svc", "svc:name=X");
    /// snap.add("a", 1);
    /// snap.add("a\\b", 2);
    /// assert_eq!(snap.make_keys_unique("\\", "_"), 1);
    /// assert!(snap.get("a_").is_some());
    /// assert!(snap.get("a\\b").is_some());
    /// ```
    pub fn make_keys_unique(&mut self, delimiter: &str, suffix: &str) -> usize {
        if suffix.is_empty() {
            return 0;
        }

        let branch_leaves: Vec<bool> = {
            let branches = branch_prefixes(&self.properties, delimiter);
            self.properties
                .iter()
                .map(|p| branches.contains(p.key.as_str()))
                .collect()
        };

        let mut renamed = 0;
        for (p, is_branch) in self.properties.iter_mut().zip(branch_leaves) {
            if is_branch {
                p.key.push_str(suffix);
                renamed += 1;
            }
        }

        let mut seen: HashSet<String> = HashSet::with_capacity(self.properties.len());
        for p in &mut self.properties {
            let mut changed = false;
            while seen.contains(&p.key) {
                p.key.push_str(suffix);
                changed = true;
            }
            if changed {
                renamed += 1;
            }
            seen.insert(p.key.clone());
        }

        renamed
    }
}

impl Extend<Property> for Snapshot {
    fn extend<T: IntoIterator<Item = Property>>(&mut self, iter: T) {
        self.properties.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

/// Every key prefix that ends right before a delimiter, i.e. every path
/// that has children.
fn branch_prefixes<'a>(properties: &'a [Property], delimiter: &str) -> HashSet<&'a str> {
    let mut prefixes = HashSet::new();
    if delimiter.is_empty() {
        return prefixes;
    }
    for p in properties {
        for (pos, _) in p.key.char_indices() {
            if p.key[pos..].starts_with(delimiter) {
                prefixes.insert(&p.key[..pos]);
            }
        }
    }
    prefixes
}
