use std::fmt;
use streamx_common::MalformedName;

/// Classification of a failure raised by a [`ResourceRegistry`](crate::registry::ResourceRegistry).
///
/// The kind decides whether an attribute is excluded permanently after it
/// fails: unsupported types, missing resources or attributes, illegal
/// registry state and stopped resources are classified failures; anything
/// else is treated as transient and retried on the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryErrorKind {
    UnsupportedType,
    NotFound,
    IllegalState,
    NotRunning,
    ConnectionLost,
    Io,
    Other,
}

impl RegistryErrorKind {
    /// `true` for failures that permanently exclude the offending attribute.
    pub fn excludes_attribute(self) -> bool {
        matches!(
            self,
            Self::UnsupportedType | Self::NotFound | Self::IllegalState | Self::NotRunning
        )
    }
}

impl fmt::Display for RegistryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType => write!(f, "unsupported type"),
            Self::NotFound => write!(f, "not found"),
            Self::IllegalState => write!(f, "illegal state"),
            Self::NotRunning => write!(f, "not running"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Io => write!(f, "i/o"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Failure reported by a resource registry.
///
/// # Examples
///
/// ```
/// use streamx_core::error::{RegistryError, RegistryErrorKind};
///
/// let err = RegistryError::not_found("no such attribute").for_attribute("Heap");
/// assert_eq!(err.kind, RegistryErrorKind::NotFound);
/// assert_eq!(err.attribute.as_deref(), Some("Heap"));
/// assert!(err.to_string().contains("not found"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Registry: {kind}: {message}")]
pub struct RegistryError {
    pub kind: RegistryErrorKind,
    /// Attribute the failure is attributed to, when the registry knows it.
    pub attribute: Option<String>,
    pub message: String,
}

impl RegistryError {
    pub fn new(kind: RegistryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            attribute: None,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RegistryErrorKind::NotFound, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(RegistryErrorKind::UnsupportedType, message)
    }

    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::new(RegistryErrorKind::ConnectionLost, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(RegistryErrorKind::Other, message)
    }

    pub fn for_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

/// Failure recorded on an [`AttributeSample`](crate::sample::AttributeSample).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A value reached the flattener in a shape it cannot store.
    #[error("Sample: unsupported value type '{type_name}' for attribute '{attribute}'")]
    UnsupportedAttribute { attribute: String, type_name: String },

    #[error("Sample: listener failure: {0}")]
    Listener(String),
}

impl SampleError {
    pub fn kind(&self) -> Option<RegistryErrorKind> {
        match self {
            Self::Registry(e) => Some(e.kind),
            Self::UnsupportedAttribute { .. } => Some(RegistryErrorKind::UnsupportedType),
            Self::Listener(_) => None,
        }
    }

    /// Attribute the failure is attributed to, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::Registry(e) => e.attribute.as_deref(),
            Self::UnsupportedAttribute { attribute, .. } => Some(attribute),
            Self::Listener(_) => None,
        }
    }

    pub fn is_connection_lost(&self) -> bool {
        self.kind() == Some(RegistryErrorKind::ConnectionLost)
    }
}

/// Top-level error for the sampling engine.
#[derive(Debug, thiserror::Error)]
pub enum StreamxError {
    #[error("Config: {0}")]
    Config(String),

    #[error(transparent)]
    MalformedName(#[from] MalformedName),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error("Scheduler: {0}")]
    Scheduler(String),
}

/// Convenience `Result` alias for engine operations.
pub type Result<T> = std::result::Result<T, StreamxError>;
