use crate::{is_kind, name_token, object_name, percent, PlatformSource, OS_DOMAIN};
use streamx_common::{AttrValue, AttributeDescriptor, ObjectName};
use streamx_core::RegistryError;
use sysinfo::{Disk, Disks};

const KIND: &str = "Disk";

/// `os:type=Disk,name=<mount point>`: space figures for each mounted disk.
pub struct DiskSource {
    disks: Disks,
}

impl DiskSource {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for DiskSource {
    fn default() -> Self {
        Self::new()
    }
}

fn mount_token(disk: &Disk) -> String {
    name_token(&disk.mount_point().to_string_lossy())
}

impl PlatformSource for DiskSource {
    fn name(&self) -> &str {
        "disk"
    }

    fn owns(&self, name: &ObjectName) -> bool {
        is_kind(name, OS_DOMAIN, KIND)
    }

    fn resources(&mut self) -> Result<Vec<ObjectName>, RegistryError> {
        self.disks.refresh_list();
        let mut names = Vec::new();
        for disk in self.disks.iter() {
            let name = object_name(&format!("os:type=Disk,name={}", mount_token(disk)))?;
            // bind mounts can show the same mount point twice
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::scalar("Total"),
            AttributeDescriptor::scalar("Used"),
            AttributeDescriptor::scalar("Available"),
            AttributeDescriptor::scalar("UsedPercent"),
            AttributeDescriptor::scalar("FileSystem"),
            AttributeDescriptor::scalar("Removable"),
        ]
    }

    fn read(&mut self, name: &ObjectName) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        self.disks.refresh();
        let wanted = name.key_property("name").unwrap_or_default();
        let disk = self
            .disks
            .iter()
            .find(|disk| mount_token(disk) == wanted)
            .ok_or_else(|| RegistryError::not_found(format!("disk {wanted} is not mounted")))?;

        let total = disk.total_space();
        let available = disk.available_space();
        let used = total.saturating_sub(available);

        Ok(vec![
            ("Total".to_string(), total.into()),
            ("Used".to_string(), used.into()),
            ("Available".to_string(), available.into()),
            ("UsedPercent".to_string(), percent(used, total).into()),
            (
                "FileSystem".to_string(),
                disk.file_system().to_string_lossy().into_owned().into(),
            ),
            ("Removable".to_string(), disk.is_removable().into()),
        ])
    }
}
