use crate::{is_kind, object_name, PlatformSource, OS_DOMAIN};
use streamx_common::{AttrValue, AttributeDescriptor, Composite, ObjectName, ValueShape};
use streamx_core::RegistryError;
use sysinfo::System;

const KIND: &str = "Load";

/// `os:type=Load`: load averages and uptime.
pub struct LoadSource;

impl LoadSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoadSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSource for LoadSource {
    fn name(&self) -> &str {
        "load"
    }

    fn owns(&self, name: &ObjectName) -> bool {
        is_kind(name, OS_DOMAIN, KIND)
    }

    fn resources(&mut self) -> Result<Vec<ObjectName>, RegistryError> {
        Ok(vec![object_name("os:type=Load")?])
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::new("SystemLoadAverage", ValueShape::Composite),
            AttributeDescriptor::scalar("Uptime").with_description("Seconds since boot"),
        ]
    }

    fn read(&mut self, _name: &ObjectName) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        let load_avg = System::load_average();
        let average = Composite::new()
            .with("one", load_avg.one)
            .with("five", load_avg.five)
            .with("fifteen", load_avg.fifteen);

        Ok(vec![
            ("SystemLoadAverage".to_string(), average.into()),
            ("Uptime".to_string(), System::uptime().into()),
        ])
    }
}
