use crate::{is_kind, object_name, percent, PlatformSource, OS_DOMAIN};
use streamx_common::{AttrValue, AttributeDescriptor, Composite, ObjectName, ValueShape};
use streamx_core::RegistryError;
use sysinfo::System;

const KIND: &str = "Memory";

/// `os:type=Memory`: physical memory in bytes plus a swap composite.
pub struct MemorySource {
    system: System,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn owns(&self, name: &ObjectName) -> bool {
        is_kind(name, OS_DOMAIN, KIND)
    }

    fn resources(&mut self) -> Result<Vec<ObjectName>, RegistryError> {
        Ok(vec![object_name("os:type=Memory")?])
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::scalar("Total"),
            AttributeDescriptor::scalar("Used"),
            AttributeDescriptor::scalar("Available"),
            AttributeDescriptor::scalar("UsedPercent"),
            AttributeDescriptor::new("Swap", ValueShape::Composite),
        ]
    }

    fn read(&mut self, _name: &ObjectName) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();

        let swap = Composite::named("Swap")
            .with("total", swap_total)
            .with("used", swap_used)
            .with("usedPercent", percent(swap_used, swap_total));

        Ok(vec![
            ("Total".to_string(), total.into()),
            ("Used".to_string(), used.into()),
            ("Available".to_string(), self.system.available_memory().into()),
            ("UsedPercent".to_string(), percent(used, total).into()),
            ("Swap".to_string(), swap.into()),
        ])
    }
}
