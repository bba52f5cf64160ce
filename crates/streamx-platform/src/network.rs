use crate::{is_kind, name_token, object_name, PlatformSource, OS_DOMAIN};
use std::collections::HashMap;
use streamx_common::{AttrValue, AttributeDescriptor, Composite, ObjectName, ValueShape};
use streamx_core::RegistryError;
use sysinfo::Networks;

const KIND: &str = "Network";

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    received: u64,
    transmitted: u64,
    packets_received: u64,
    packets_transmitted: u64,
}

/// `os:type=Network,name=<interface>`: running totals plus the traffic
/// since the previous read of the same interface.
pub struct NetworkSource {
    networks: Networks,
    previous: HashMap<String, Counters>,
}

impl NetworkSource {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            previous: HashMap::new(),
        }
    }
}

impl Default for NetworkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSource for NetworkSource {
    fn name(&self) -> &str {
        "network"
    }

    fn owns(&self, name: &ObjectName) -> bool {
        is_kind(name, OS_DOMAIN, KIND)
    }

    fn resources(&mut self) -> Result<Vec<ObjectName>, RegistryError> {
        self.networks.refresh_list();
        let mut names = Vec::new();
        for (iface, _) in self.networks.iter() {
            names.push(object_name(&format!("os:type=Network,name={}", name_token(iface)))?);
        }
        Ok(names)
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::scalar("Received"),
            AttributeDescriptor::scalar("Transmitted"),
            AttributeDescriptor::scalar("PacketsReceived"),
            AttributeDescriptor::scalar("PacketsTransmitted"),
            AttributeDescriptor::new("Traffic", ValueShape::Composite)
                .with_description("Deltas since the previous read"),
        ]
    }

    fn read(&mut self, name: &ObjectName) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        self.networks.refresh();
        let wanted = name.key_property("name").unwrap_or_default();
        let (iface, data) = self
            .networks
            .iter()
            .find(|(iface, _)| name_token(iface) == wanted)
            .ok_or_else(|| RegistryError::not_found(format!("network interface {wanted} is gone")))?;

        let now = Counters {
            received: data.total_received(),
            transmitted: data.total_transmitted(),
            packets_received: data.total_packets_received(),
            packets_transmitted: data.total_packets_transmitted(),
        };
        // first read reports zero traffic
        let prev = self.previous.get(iface).copied().unwrap_or(now);
        let traffic = Composite::new()
            .with("bytesReceived", now.received.saturating_sub(prev.received))
            .with("bytesSent", now.transmitted.saturating_sub(prev.transmitted))
            .with(
                "packetsReceived",
                now.packets_received.saturating_sub(prev.packets_received),
            )
            .with(
                "packetsSent",
                now.packets_transmitted.saturating_sub(prev.packets_transmitted),
            );
        self.previous.insert(iface.clone(), now);

        Ok(vec![
            ("Received".to_string(), now.received.into()),
            ("Transmitted".to_string(), now.transmitted.into()),
            ("PacketsReceived".to_string(), now.packets_received.into()),
            ("PacketsTransmitted".to_string(), now.packets_transmitted.into()),
            ("Traffic".to_string(), traffic.into()),
        ])
    }
}
