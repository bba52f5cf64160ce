use crate::{is_kind, object_name, PlatformSource, OS_DOMAIN};
use streamx_common::{AttrValue, AttributeDescriptor, Composite, ObjectName, Tabular, ValueShape};
use streamx_core::RegistryError;
use sysinfo::System;

const KIND: &str = "Cpu";

/// `os:type=Cpu`: global usage plus one table row per core.
pub struct CpuSource {
    system: System,
}

impl CpuSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Default for CpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSource for CpuSource {
    fn name(&self) -> &str {
        "cpu"
    }

    fn owns(&self, name: &ObjectName) -> bool {
        is_kind(name, OS_DOMAIN, KIND)
    }

    fn resources(&mut self) -> Result<Vec<ObjectName>, RegistryError> {
        Ok(vec![object_name("os:type=Cpu")?])
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::scalar("GlobalUsage").with_description("Usage across all cores, in percent"),
            AttributeDescriptor::scalar("CoreCount"),
            AttributeDescriptor::new("Cores", ValueShape::Tabular),
        ]
    }

    fn read(&mut self, _name: &ObjectName) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        self.system.refresh_cpu_all();

        let cores: Vec<AttrValue> = self
            .system
            .cpus()
            .iter()
            .enumerate()
            .map(|(i, cpu)| {
                Composite::new()
                    .with("core", i)
                    .with("usage", cpu.cpu_usage() as f64)
                    .with("frequency", cpu.frequency())
                    .into()
            })
            .collect();

        Ok(vec![
            ("GlobalUsage".to_string(), (self.system.global_cpu_usage() as f64).into()),
            ("CoreCount".to_string(), self.system.cpus().len().into()),
            ("Cores".to_string(), Tabular::new(cores).into()),
        ])
    }
}
