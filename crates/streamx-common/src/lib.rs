//! Types shared by every streamx crate.
//!
//! Resources in a managed-resource registry are addressed by an
//! [`name::ObjectName`] and expose attributes whose values are modelled by
//! [`value::AttrValue`]. Sampling one resource produces a flat
//! [`snapshot::Snapshot`] of path-keyed properties.

pub mod id;
pub mod name;
pub mod snapshot;
pub mod types;
pub mod value;

#[cfg(test)]
mod tests;

pub use name::{MalformedName, ObjectName, ObjectNamePattern};
pub use snapshot::{Property, Snapshot};
pub use types::{AttributeDescriptor, Severity, ValueShape};
pub use value::{AttrValue, Composite, Tabular, UNAVAILABLE};
