//! Host metrics exposed as a [`ResourceRegistry`].
//!
//! Each [`PlatformSource`] owns one category of resources (CPU, memory,
//! load, disks, network interfaces, the running process) and reads fresh
//! values from the operating system on every request. [`PlatformRegistry`]
//! routes queries and reads to the source owning a resource name.

pub mod cpu;
pub mod disk;
pub mod load;
pub mod memory;
pub mod network;
pub mod process;

use parking_lot::Mutex;
use streamx_common::{AttrValue, AttributeDescriptor, ObjectName, ObjectNamePattern};
use streamx_core::registry::ResourceRegistry;
use streamx_core::RegistryError;

/// Domain of operating-system resources.
pub const OS_DOMAIN: &str = "os";
/// Domain of resources describing the sampling process itself.
pub const PROCESS_DOMAIN: &str = "process";

/// One category of host resources.
///
/// Sources keep their own `sysinfo` state and refresh it on every
/// [`read`](Self::read).
pub trait PlatformSource: Send {
    /// Returns the source name (e.g., `"cpu"`, `"disk"`), used for logging.
    fn name(&self) -> &str;

    /// Whether `name` belongs to this source, whether or not it still exists.
    fn owns(&self, name: &ObjectName) -> bool;

    /// Resources currently exposed by this source.
    fn resources(&mut self) -> Result<Vec<ObjectName>, RegistryError>;

    /// Attribute metadata shared by every resource of this source.
    fn descriptors(&self) -> Vec<AttributeDescriptor>;

    /// Reads every attribute of one resource.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the resource disappeared since discovery.
    fn read(&mut self, name: &ObjectName) -> Result<Vec<(String, AttrValue)>, RegistryError>;
}

/// Registry over the host's CPU, memory, load, disks, network interfaces
/// and the current process.
///
/// The registry cannot push registration events, so a sampler re-queries it
/// on every cycle. Disks or interfaces that appear are added then, and ones
/// that vanish are dropped. A read racing a removal fails with a not-found
/// error that names no attribute.
pub struct PlatformRegistry {
    name: String,
    sources: Vec<Mutex<Box<dyn PlatformSource>>>,
}

impl PlatformRegistry {
    /// Registry with every built-in source.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_sources(
            name,
            vec![
                Box::new(cpu::CpuSource::new()),
                Box::new(memory::MemorySource::new()),
                Box::new(load::LoadSource::new()),
                Box::new(disk::DiskSource::new()),
                Box::new(network::NetworkSource::new()),
                Box::new(process::ProcessSource::new()),
            ],
        )
    }

    pub fn with_sources(name: impl Into<String>, sources: Vec<Box<dyn PlatformSource>>) -> Self {
        Self {
            name: name.into(),
            sources: sources.into_iter().map(Mutex::new).collect(),
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|source| source.lock().name().to_string())
            .collect()
    }

    fn owner(&self, name: &ObjectName) -> Result<&Mutex<Box<dyn PlatformSource>>, RegistryError> {
        self.sources
            .iter()
            .find(|source| source.lock().owns(name))
            .ok_or_else(|| RegistryError::not_found(format!("no platform resource {name}")))
    }
}

impl ResourceRegistry for PlatformRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_names(&self, pattern: &ObjectNamePattern) -> Result<Vec<ObjectName>, RegistryError> {
        let mut names = Vec::new();
        for source in &self.sources {
            let mut source = source.lock();
            match source.resources() {
                Ok(found) => names.extend(found.into_iter().filter(|n| pattern.matches(n))),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Platform query failed");
                    return Err(e);
                }
            }
        }
        Ok(names)
    }

    fn descriptors(&self, name: &ObjectName) -> Result<Vec<AttributeDescriptor>, RegistryError> {
        Ok(self.owner(name)?.lock().descriptors())
    }

    fn get_attributes(
        &self,
        name: &ObjectName,
        attributes: &[String],
    ) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        let values = self.owner(name)?.lock().read(name)?;
        Ok(values
            .into_iter()
            .filter(|(attr, _)| attributes.iter().any(|a| a == attr))
            .collect())
    }

    fn resource_count(&self) -> Result<usize, RegistryError> {
        let mut count = 0;
        for source in &self.sources {
            count += source.lock().resources()?.len();
        }
        Ok(count)
    }
}

/// Parses a resource name built by a source.
pub(crate) fn object_name(raw: &str) -> Result<ObjectName, RegistryError> {
    ObjectName::new(raw).map_err(|e| RegistryError::other(e.to_string()))
}

/// Makes an OS-supplied label (mount point, interface name) usable as a
/// key property value.
pub(crate) fn name_token(raw: &str) -> String {
    let token: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            ',' | '=' | ':' | '*' | '?' => '_',
            c => c,
        })
        .collect();
    if token.is_empty() {
        "_".to_string()
    } else {
        token
    }
}

/// `true` if `name` is `<domain>:type=<kind>[,...]`.
pub(crate) fn is_kind(name: &ObjectName, domain: &str, kind: &str) -> bool {
    name.domain() == domain && name.key_property("type") == Some(kind)
}

pub(crate) fn percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
