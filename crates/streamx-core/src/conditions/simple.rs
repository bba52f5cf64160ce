use super::AttributeCondition;
use crate::context::SampleContext;
use crate::sample::AttributeSample;
use std::cmp::Ordering;
use std::str::FromStr;
use streamx_common::{AttrValue, ObjectNamePattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" | "eq" | "equal" => Ok(Self::Equal),
            "!=" | "<>" | "ne" | "not_equal" => Ok(Self::NotEqual),
            ">" | "gt" | "greater_than" => Ok(Self::GreaterThan),
            "<" | "lt" | "less_than" => Ok(Self::LessThan),
            ">=" | "gte" | "greater_equal" => Ok(Self::GreaterEqual),
            "<=" | "lte" | "less_equal" => Ok(Self::LessEqual),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::NotEqual => write!(f, "not_equal"),
            Self::GreaterThan => write!(f, "greater_than"),
            Self::LessThan => write!(f, "less_than"),
            Self::GreaterEqual => write!(f, "greater_equal"),
            Self::LessEqual => write!(f, "less_equal"),
        }
    }
}

impl CompareOp {
    /// Numbers compare numerically. Anything else only supports equality,
    /// compared on the display text.
    fn check(&self, value: &AttrValue, threshold: &AttrValue) -> bool {
        let ordering = match (value.as_f64(), threshold.as_f64()) {
            (Some(v), Some(t)) => v.partial_cmp(&t),
            _ => match self {
                Self::Equal | Self::NotEqual => Some(value.to_string().cmp(&threshold.to_string())),
                _ => None,
            },
        };
        let Some(ordering) = ordering else {
            return false;
        };
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::LessThan => ordering == Ordering::Less,
            Self::GreaterEqual => ordering != Ordering::Less,
            Self::LessEqual => ordering != Ordering::Greater,
        }
    }
}

/// Compares one attribute of the matching resources against a fixed value.
///
/// # Examples
///
/// ```
/// use streamx_core::conditions::{CompareOp, SimpleCondition};
///
/// let cond = SimpleCondition::new("heap-high", "svc:*".parse().unwrap(), "HeapUsed", CompareOp::GreaterThan, 100.into());
/// assert_eq!(cond.to_string(), "heap-high: svc:* HeapUsed greater_than 100");
/// ```
#[derive(Debug, Clone)]
pub struct SimpleCondition {
    pub name: String,
    pub resource: ObjectNamePattern,
    pub attribute: String,
    pub operator: CompareOp,
    pub value: AttrValue,
}

impl SimpleCondition {
    pub fn new(
        name: impl Into<String>,
        resource: ObjectNamePattern,
        attribute: impl Into<String>,
        operator: CompareOp,
        value: AttrValue,
    ) -> Self {
        Self {
            name: name.into(),
            resource,
            attribute: attribute.into(),
            operator,
            value,
        }
    }
}

impl std::fmt::Display for SimpleCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} {} {} {}",
            self.name, self.resource, self.attribute, self.operator, self.value
        )
    }
}

impl AttributeCondition for SimpleCondition {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, _ctx: &SampleContext, sample: &AttributeSample) -> bool {
        if !self.resource.matches(sample.name()) {
            return false;
        }
        match sample.value(&self.attribute) {
            Some(value) if !value.is_unavailable() => self.operator.check(value, &self.value),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_aliases() {
        assert_eq!(">=".parse::<CompareOp>().unwrap(), CompareOp::GreaterEqual);
        assert_eq!("gt".parse::<CompareOp>().unwrap(), CompareOp::GreaterThan);
        assert_eq!("==".parse::<CompareOp>().unwrap(), CompareOp::Equal);
        assert!("~".parse::<CompareOp>().is_err());
    }

    #[test]
    fn test_numeric_comparison() {
        let ten = AttrValue::Int(10);
        assert!(CompareOp::GreaterThan.check(&ten, &AttrValue::Float(9.5)));
        assert!(CompareOp::LessEqual.check(&ten, &AttrValue::UInt(10)));
        assert!(CompareOp::Equal.check(&AttrValue::from("10"), &ten));
        assert!(!CompareOp::LessThan.check(&ten, &ten));
    }

    #[test]
    fn test_text_supports_equality_only() {
        let up = AttrValue::from("UP");
        assert!(CompareOp::Equal.check(&up, &AttrValue::from("UP")));
        assert!(CompareOp::NotEqual.check(&up, &AttrValue::from("DOWN")));
        assert!(!CompareOp::GreaterThan.check(&up, &AttrValue::from("A")));
    }
}
