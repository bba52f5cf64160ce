//! Turns nested attribute values into flat, path-keyed snapshot properties.
//!
//! The walk follows four rules:
//!
//! 1. A list holding composite or tabular elements recurses into each
//!    element under a 1-based, zero-padded index token (`01`, `02`, ...).
//! 2. A composite whose keys are exactly `{key, value}` contributes one
//!    level named after its `key` and recurses into `value`. Any other
//!    composite recurses into every entry under the entry's key.
//! 3. A tabular value recurses into every row. Key/value rows supply their
//!    own token; other rows are addressed by index as in rule 1.
//! 4. Supported scalars (including lists of scalars) become one property
//!    under the current path. Anything else fails the attribute.

mod name;

pub use name::PropertyNameBuilder;

use crate::config::SamplerConfig;
use crate::error::SampleError;
use streamx_common::{AttrValue, Composite, Snapshot};

fn index_token(index: usize) -> String {
    format!("{:02}", index + 1)
}

/// Flattens attribute values into a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct Flattener {
    delimiter: String,
    replacement: String,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new("\\", "!")
    }
}

impl Flattener {
    pub fn new(delimiter: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            replacement: replacement.into(),
        }
    }

    pub fn from_config(config: &SamplerConfig) -> Self {
        Self::new(&config.path_delimiter, &config.delimiter_replacement)
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Adds the properties for one attribute and returns how many were added.
    ///
    /// An attribute is all-or-nothing: if any part of the value cannot be
    /// stored, the properties added for it are removed again and
    /// [`SampleError::UnsupportedAttribute`] is returned.
    ///
    /// ```
    /// use streamx_core::flatten::Flattener;
    /// use streamx_common::{Composite, Snapshot};
    ///
    /// let mut snap = Snapshot::new("svc", "svc:name=X");
    /// let usage = Composite::new().with("used", 10).with("max", 20);
    /// let added = Flattener::default().flatten_into(&mut snap, "Heap", &usage.into()).unwrap();
    /// assert_eq!(added, 2);
    /// assert!(snap.get("Heap\\used").is_some());
    /// ```
    pub fn flatten_into(
        &self,
        snapshot: &mut Snapshot,
        attribute: &str,
        value: &AttrValue,
    ) -> Result<usize, SampleError> {
        let before = snapshot.len();
        let mut names = PropertyNameBuilder::new(attribute, &self.delimiter, &self.replacement);
        match self.process(snapshot, attribute, &mut names, value) {
            Ok(()) => Ok(snapshot.len() - before),
            Err(err) => {
                snapshot.truncate(before);
                Err(err)
            }
        }
    }

    fn process(
        &self,
        snapshot: &mut Snapshot,
        attribute: &str,
        names: &mut PropertyNameBuilder,
        value: &AttrValue,
    ) -> Result<(), SampleError> {
        match value {
            AttrValue::List(items) if value.is_nested_list() => {
                for (i, item) in items.iter().enumerate() {
                    self.process_level(snapshot, attribute, names, &index_token(i), item)?;
                }
                Ok(())
            }
            AttrValue::Composite(composite) if composite.is_key_value_pair() => {
                self.process_pair(snapshot, attribute, names, composite)
            }
            AttrValue::Composite(composite) => {
                for (key, entry) in &composite.entries {
                    self.process_level(snapshot, attribute, names, key, entry)?;
                }
                Ok(())
            }
            AttrValue::Tabular(table) => {
                for (i, row) in table.rows.iter().enumerate() {
                    match row {
                        AttrValue::Composite(pair) if pair.is_key_value_pair() => {
                            self.process_pair(snapshot, attribute, names, pair)?;
                        }
                        _ => self.process_level(snapshot, attribute, names, &index_token(i), row)?,
                    }
                }
                Ok(())
            }
            scalar if scalar.is_supported_scalar() => {
                snapshot.add(names.as_str(), scalar.clone());
                Ok(())
            }
            other => Err(SampleError::UnsupportedAttribute {
                attribute: attribute.to_string(),
                type_name: other.type_name().to_string(),
            }),
        }
    }

    fn process_pair(
        &self,
        snapshot: &mut Snapshot,
        attribute: &str,
        names: &mut PropertyNameBuilder,
        pair: &Composite,
    ) -> Result<(), SampleError> {
        let key = pair.get("key").map(ToString::to_string).unwrap_or_default();
        let value = pair.get("value").unwrap_or(&AttrValue::Null);
        self.process_level(snapshot, attribute, names, &key, value)
    }

    fn process_level(
        &self,
        snapshot: &mut Snapshot,
        attribute: &str,
        names: &mut PropertyNameBuilder,
        token: &str,
        value: &AttrValue,
    ) -> Result<(), SampleError> {
        names.append(token);
        let result = self.process(snapshot, attribute, names, value);
        names.pop_level();
        result
    }
}
