use crate::value::AttrValue;
use serde::{Deserialize, Serialize};

/// Severity attached to sampling errors, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use streamx_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Error);
/// assert!(Severity::Error.is_hard());
/// assert!(!Severity::Warning.is_hard());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// `Error` and above count as hard errors.
    pub fn is_hard(self) -> bool {
        self >= Severity::Error
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" | "fatal" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Declared shape of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    Scalar,
    Composite,
    Tabular,
    ArrayOf(Box<ValueShape>),
}

impl ValueShape {
    /// Infers the shape of a concrete value. A list takes the shape of its
    /// first nested element, or is scalar when it holds only scalars.
    ///
    /// ```
    /// use streamx_common::types::ValueShape;
    /// use streamx_common::value::{AttrValue, Composite};
    ///
    /// assert_eq!(ValueShape::of(&AttrValue::Int(1)), ValueShape::Scalar);
    /// let list = AttrValue::List(vec![Composite::new().with("a", 1).into()]);
    /// assert_eq!(ValueShape::of(&list), ValueShape::ArrayOf(Box::new(ValueShape::Composite)));
    /// ```
    pub fn of(value: &AttrValue) -> Self {
        match value {
            AttrValue::Composite(_) => ValueShape::Composite,
            AttrValue::Tabular(_) => ValueShape::Tabular,
            AttrValue::List(items) => match items.iter().find(|v| v.is_nested()) {
                Some(nested) => ValueShape::ArrayOf(Box::new(ValueShape::of(nested))),
                None => ValueShape::Scalar,
            },
            _ => ValueShape::Scalar,
        }
    }
}

/// Metadata for one named attribute of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub readable: bool,
    pub shape: ValueShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AttributeDescriptor {
    /// A readable attribute of the given shape.
    pub fn new(name: impl Into<String>, shape: ValueShape) -> Self {
        Self {
            name: name.into(),
            readable: true,
            shape,
            description: None,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, ValueShape::Scalar)
    }

    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
