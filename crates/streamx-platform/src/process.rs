use crate::{is_kind, object_name, PlatformSource, PROCESS_DOMAIN};
use chrono::DateTime;
use streamx_common::{AttrValue, AttributeDescriptor, Composite, ObjectName, ValueShape};
use streamx_core::RegistryError;
use sysinfo::{Pid, ProcessesToUpdate, System};

const KIND: &str = "Runtime";

/// `process:type=Runtime`: identity and footprint of the sampling process.
pub struct ProcessSource {
    system: System,
    pid: Option<Pid>,
}

impl ProcessSource {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "Current process id unavailable");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
        }
    }
}

impl Default for ProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp(secs: u64) -> AttrValue {
    match DateTime::from_timestamp(secs as i64, 0) {
        Some(at) => at.to_rfc3339().into(),
        None => AttrValue::unavailable(),
    }
}

impl PlatformSource for ProcessSource {
    fn name(&self) -> &str {
        "process"
    }

    fn owns(&self, name: &ObjectName) -> bool {
        is_kind(name, PROCESS_DOMAIN, KIND)
    }

    fn resources(&mut self) -> Result<Vec<ObjectName>, RegistryError> {
        if self.pid.is_none() {
            return Ok(Vec::new());
        }
        Ok(vec![object_name("process:type=Runtime")?])
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::scalar("Pid"),
            AttributeDescriptor::scalar("HostName"),
            AttributeDescriptor::scalar("OsVersion"),
            AttributeDescriptor::scalar("BootTime"),
            AttributeDescriptor::scalar("StartTime"),
            AttributeDescriptor::scalar("RunTime").with_description("Seconds since the process started"),
            AttributeDescriptor::new("Memory", ValueShape::Composite),
            AttributeDescriptor::scalar("CpuUsage"),
        ]
    }

    fn read(&mut self, _name: &ObjectName) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        let pid = self
            .pid
            .ok_or_else(|| RegistryError::not_found("current process id unavailable"))?;
        self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let process = self
            .system
            .process(pid)
            .ok_or_else(|| RegistryError::not_found(format!("process {pid} not found")))?;

        let memory = Composite::named("Memory")
            .with("resident", process.memory())
            .with("virtual", process.virtual_memory());

        Ok(vec![
            ("Pid".to_string(), pid.as_u32().into()),
            (
                "HostName".to_string(),
                System::host_name().map_or_else(AttrValue::unavailable, AttrValue::from),
            ),
            (
                "OsVersion".to_string(),
                System::long_os_version().map_or_else(AttrValue::unavailable, AttrValue::from),
            ),
            ("BootTime".to_string(), timestamp(System::boot_time())),
            ("StartTime".to_string(), timestamp(process.start_time())),
            ("RunTime".to_string(), process.run_time().into()),
            ("Memory".to_string(), memory.into()),
            ("CpuUsage".to_string(), (process.cpu_usage() as f64).into()),
        ])
    }
}
