use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use streamx_common::{AttrValue, AttributeDescriptor, ObjectName};
use streamx_core::registry::ResourceRegistry;
use streamx_core::{RegistryError, Sampler, SamplerConfig};
use streamx_platform::{PlatformRegistry, PlatformSource};

/// Disks mounted and unmounted by the test.
struct Mounts(Arc<Mutex<Vec<&'static str>>>);

impl Mounts {
    fn name(mount: &str) -> ObjectName {
        ObjectName::new(&format!("os:type=Disk,name={mount}")).unwrap()
    }
}

impl PlatformSource for Mounts {
    fn name(&self) -> &str {
        "mounts"
    }

    fn owns(&self, name: &ObjectName) -> bool {
        name.key_property("type") == Some("Disk")
    }

    fn resources(&mut self) -> Result<Vec<ObjectName>, RegistryError> {
        Ok(self.0.lock().iter().map(|m| Self::name(m)).collect())
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        vec![AttributeDescriptor::scalar("Total")]
    }

    fn read(&mut self, name: &ObjectName) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        if self.0.lock().iter().any(|m| &Self::name(m) == name) {
            Ok(vec![("Total".to_string(), AttrValue::UInt(100))])
        } else {
            Err(RegistryError::not_found(format!("{name} is not mounted")))
        }
    }
}

#[tokio::test]
async fn platform_resources_flatten_into_snapshots() {
    let registry: Arc<dyn ResourceRegistry> = Arc::new(PlatformRegistry::new("platform"));
    let mut sampler = Sampler::new("host", registry);
    sampler
        .set_schedule(SamplerConfig::new("os:type=Cpu;os:type=Memory", Duration::from_secs(10)))
        .unwrap();

    let activity = sampler.sample_once().await.unwrap();

    let cpu = activity
        .snapshots()
        .iter()
        .find(|s| s.name() == "os:type=Cpu")
        .unwrap();
    assert!(cpu.get("GlobalUsage").is_some());
    assert_eq!(cpu.get("Cores\\01\\core"), Some(&AttrValue::UInt(0)));

    let memory = activity
        .snapshots()
        .iter()
        .find(|s| s.name() == "os:type=Memory")
        .unwrap();
    assert!(memory.get("Swap\\total").is_some());
    assert!(memory.get("Swap\\usedPercent").is_some());

    let ctx = sampler.handler().unwrap().context();
    assert_eq!(ctx.error_count(), 0);
    assert_eq!(ctx.resource_count(), 2);
    sampler.cancel().await;
}

#[tokio::test]
async fn mounted_and_unmounted_disks_follow_the_host() {
    let mounts = Arc::new(Mutex::new(vec!["a"]));
    let registry: Arc<dyn ResourceRegistry> = Arc::new(PlatformRegistry::with_sources(
        "platform",
        vec![Box::new(Mounts(mounts.clone()))],
    ));
    let mut sampler = Sampler::new("host", registry);
    sampler
        .set_schedule(SamplerConfig::new("os:type=Disk,*", Duration::from_secs(10)))
        .unwrap();
    sampler.sample_once().await.unwrap();

    *mounts.lock() = vec!["b"];
    let activity = sampler.sample_once().await.unwrap();

    let names: Vec<&str> = activity.snapshots().iter().map(|s| s.name()).collect();
    assert!(names.contains(&"os:name=b,type=Disk"));
    assert!(!names.contains(&"os:name=a,type=Disk"));
    let handler = sampler.handler().unwrap();
    assert_eq!(handler.resource_count(), 1);
    assert!(handler.permanent_excludes(&Mounts::name("a")).is_empty());
    assert_eq!(handler.context().error_count(), 0);
    assert_eq!(handler.context().noop_count(), 0);
    sampler.cancel().await;
}
