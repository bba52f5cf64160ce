use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel stored for an attribute the registry did not return.
pub const UNAVAILABLE: &str = "<unavailable>";

/// Value of one resource attribute as read from the registry.
///
/// Scalars (null, booleans, numbers, text, bytes) end up as snapshot property
/// values. [`Composite`], [`Tabular`] and lists that contain either are nested
/// structures the flattener walks. [`AttrValue::Opaque`] stands for a value
/// whose type the registry could not express in this model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<AttrValue>),
    Composite(Composite),
    Tabular(Tabular),
    Opaque { type_name: String },
}

impl AttrValue {
    pub fn unavailable() -> Self {
        AttrValue::Text(UNAVAILABLE.to_string())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, AttrValue::Text(s) if s == UNAVAILABLE)
    }

    /// `true` for composite and tabular values.
    pub fn is_nested(&self) -> bool {
        matches!(self, AttrValue::Composite(_) | AttrValue::Tabular(_))
    }

    /// `true` for a list holding at least one composite or tabular element.
    pub fn is_nested_list(&self) -> bool {
        matches!(self, AttrValue::List(items) if items.iter().any(AttrValue::is_nested))
    }

    /// `true` if the value can be stored as a snapshot property as-is.
    pub fn is_supported_scalar(&self) -> bool {
        match self {
            AttrValue::Null
            | AttrValue::Bool(_)
            | AttrValue::Int(_)
            | AttrValue::UInt(_)
            | AttrValue::Float(_)
            | AttrValue::Text(_)
            | AttrValue::Bytes(_) => true,
            AttrValue::List(items) => items.iter().all(AttrValue::is_supported_scalar),
            AttrValue::Composite(_) | AttrValue::Tabular(_) | AttrValue::Opaque { .. } => false,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "i64",
            AttrValue::UInt(_) => "u64",
            AttrValue::Float(_) => "f64",
            AttrValue::Text(_) => "string",
            AttrValue::Bytes(_) => "bytes",
            AttrValue::List(_) => "list",
            AttrValue::Composite(c) => c.type_name.as_deref().unwrap_or("composite"),
            AttrValue::Tabular(t) => t.type_name.as_deref().unwrap_or("tabular"),
            AttrValue::Opaque { type_name } => type_name,
        }
    }

    /// Numeric view used by conditions. Text is parsed when it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::UInt(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttrValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "null"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::UInt(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Bytes(bytes) => {
                let parts: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AttrValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AttrValue::Composite(c) => {
                let parts: Vec<String> = c.entries.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            AttrValue::Tabular(t) => {
                let parts: Vec<String> = t.rows.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AttrValue::Opaque { type_name } => write!(f, "<{type_name}>"),
        }
    }
}

/// Named map of heterogeneous sub-values. Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Composite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub entries: BTreeMap<String, AttrValue>,
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            entries: BTreeMap::new(),
        }
    }

    /// Builds the `{key, value}` pair idiom used for map-like rows.
    pub fn key_value(key: impl Into<AttrValue>, value: impl Into<AttrValue>) -> Self {
        Self::new().with("key", key).with("value", value)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` when the key set is exactly `{key, value}`.
    pub fn is_key_value_pair(&self) -> bool {
        self.entries.len() == 2 && self.entries.contains_key("key") && self.entries.contains_key("value")
    }
}

/// Ordered collection of rows, each normally a [`Composite`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tabular {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub rows: Vec<AttrValue>,
}

impl Tabular {
    pub fn new(rows: Vec<AttrValue>) -> Self {
        Self {
            type_name: None,
            rows,
        }
    }

    pub fn push(&mut self, row: impl Into<AttrValue>) {
        self.rows.push(row.into());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Composite> for AttrValue {
    fn from(c: Composite) -> Self {
        AttrValue::Composite(c)
    }
}

impl From<Tabular> for AttrValue {
    fn from(t: Tabular) -> Self {
        AttrValue::Tabular(t)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::UInt(v.into())
    }
}

impl From<u64> for AttrValue {
    fn from(v: u64) -> Self {
        AttrValue::UInt(v)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::UInt(v as u64)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Float(v.into())
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttrValue::Bytes(bytes)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(AttrValue::Null, Into::into)
    }
}

/// JSON objects become composites and arrays become lists.
///
/// ```
/// use serde_json::json;
/// use streamx_common::value::AttrValue;
///
/// let v = AttrValue::from(json!({"key": "k1", "value": 42}));
/// match v {
///     AttrValue::Composite(c) => assert!(c.is_key_value_pair()),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
impl From<serde_json::Value> for AttrValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttrValue::Null,
            serde_json::Value::Bool(b) => AttrValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttrValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    AttrValue::UInt(u)
                } else {
                    AttrValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => AttrValue::Text(s),
            serde_json::Value::Array(items) => {
                AttrValue::List(items.into_iter().map(AttrValue::from).collect())
            }
            serde_json::Value::Object(map) => AttrValue::Composite(Composite {
                type_name: None,
                entries: map.into_iter().map(|(k, v)| (k, AttrValue::from(v))).collect(),
            }),
        }
    }
}
