//! Access to a managed-resource registry.
//!
//! The engine never talks to a concrete backend directly. It discovers
//! resources with [`ResourceRegistry::query_names`], reads their metadata
//! with [`ResourceRegistry::descriptors`] and fetches values with
//! [`ResourceRegistry::get_attributes`]. Registries that can push
//! registration events accept a [`RegistryChangeListener`] through
//! [`ResourceRegistry::subscribe`].

pub mod memory;

use crate::error::RegistryError;
use std::sync::Arc;
use streamx_common::{AttrValue, AttributeDescriptor, ObjectName, ObjectNamePattern};

pub use memory::InMemoryRegistry;

/// Registration change pushed by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered(ObjectName),
    Unregistered(ObjectName),
}

impl RegistryEvent {
    pub fn name(&self) -> &ObjectName {
        match self {
            Self::Registered(name) | Self::Unregistered(name) => name,
        }
    }
}

/// Receiver of [`RegistryEvent`]s. Called on whatever thread the registry
/// delivers events from.
pub trait RegistryChangeListener: Send + Sync {
    fn on_change(&self, event: RegistryEvent);
}

/// A registry of named resources, each exposing named attributes.
pub trait ResourceRegistry: Send + Sync {
    /// Identifies the registry in logs.
    fn name(&self) -> &str;

    /// Names of all resources matching `pattern`.
    fn query_names(&self, pattern: &ObjectNamePattern) -> Result<Vec<ObjectName>, RegistryError>;

    /// Attribute metadata of one resource.
    fn descriptors(&self, name: &ObjectName) -> Result<Vec<AttributeDescriptor>, RegistryError>;

    /// Reads the requested attributes in one round trip.
    ///
    /// Attributes the registry cannot read may be left out of the result;
    /// the caller fills the gaps. An `Err` fails the whole batch.
    fn get_attributes(
        &self,
        name: &ObjectName,
        attributes: &[String],
    ) -> Result<Vec<(String, AttrValue)>, RegistryError>;

    /// Number of resources currently registered.
    fn resource_count(&self) -> Result<usize, RegistryError>;

    /// Starts delivering registration events to `listener`.
    ///
    /// Returns `Ok(false)` when the registry cannot push events.
    fn subscribe(&self, listener: Arc<dyn RegistryChangeListener>) -> Result<bool, RegistryError> {
        let _ = listener;
        Ok(false)
    }

    /// Stops delivering events to a listener previously passed to
    /// [`subscribe`](Self::subscribe).
    fn unsubscribe(&self, listener: &Arc<dyn RegistryChangeListener>) {
        let _ = listener;
    }
}
