use super::SampleListener;
use crate::config::SamplerConfig;
use crate::context::SampleContext;
use crate::error::SampleError;
use crate::flatten::Flattener;
use crate::sample::AttributeSample;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use streamx_common::{AttrValue, ObjectName, Severity};

/// Property carrying the resource name when `force_object_name` is set.
pub const OBJECT_NAME_PROPERTY: &str = "objectName";

pub const STAT_UNSUPPORTED_COUNT: &str = "listener.unsupported.count";
pub const STAT_FORCE_OBJECT_NAME: &str = "listener.force.object.name";
pub const STAT_SILENCE_SET_COUNT: &str = "listener.silence.set.count";

/// The default listener: drops unreadable attributes before the read and
/// flattens every value into the sample's snapshot after it.
///
/// Attributes that failed once are remembered and silenced on later
/// cycles, so a value that keeps failing is reported loudly only once.
pub struct FlatteningListener {
    flattener: Flattener,
    force_object_name: bool,
    unsupported: AtomicU64,
    silenced: Mutex<HashSet<(ObjectName, String)>>,
}

impl FlatteningListener {
    pub fn new(flattener: Flattener, force_object_name: bool) -> Self {
        Self {
            flattener,
            force_object_name,
            unsupported: AtomicU64::new(0),
            silenced: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_config(config: &SamplerConfig) -> Self {
        Self::new(Flattener::from_config(config), config.force_object_name)
    }

    /// Attributes rejected by the flattener so far.
    pub fn unsupported_count(&self) -> u64 {
        self.unsupported.load(Ordering::Relaxed)
    }

    pub fn silenced_count(&self) -> usize {
        self.silenced.lock().len()
    }
}

impl SampleListener for FlatteningListener {
    fn pre_sample(&self, _ctx: &SampleContext, sample: &mut AttributeSample) {
        let unreadable: Vec<String> = sample
            .descriptors()
            .iter()
            .filter(|d| !d.readable)
            .map(|d| d.name.clone())
            .collect();
        for attribute in unreadable {
            sample.exclude(&attribute);
        }

        let silenced: Vec<String> = {
            let set = self.silenced.lock();
            sample
                .descriptors()
                .iter()
                .filter(|d| set.contains(&(sample.name().clone(), d.name.clone())))
                .map(|d| d.name.clone())
                .collect()
        };
        for attribute in silenced {
            sample.silence(&attribute);
        }
    }

    fn post_sample(&self, _ctx: &SampleContext, sample: &mut AttributeSample) -> Result<(), SampleError> {
        let canonical = sample.name().canonical().to_string();
        let (values, snapshot) = sample.values_and_snapshot_mut();

        let mut first_error = None;
        for (attribute, value) in values {
            if let Err(err) = self.flattener.flatten_into(snapshot, attribute, value) {
                self.unsupported.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(resource = %canonical, attribute = %attribute, error = %err, "Attribute not flattened");
                first_error.get_or_insert(err);
            }
        }

        if self.force_object_name && snapshot.get(OBJECT_NAME_PROPERTY).is_none() {
            snapshot.add_transient(OBJECT_NAME_PROPERTY, canonical);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn sample_error(&self, _ctx: &SampleContext, sample: &AttributeSample, _severity: Severity) {
        let Some(err) = sample.error() else {
            return;
        };
        let attributes = match err.attribute() {
            Some(attribute) => vec![attribute.to_string()],
            None => sample.attributes_to_sample(),
        };
        let mut set = self.silenced.lock();
        for attribute in attributes {
            set.insert((sample.name().clone(), attribute));
        }
    }

    fn unregister(&self, _ctx: &SampleContext, name: &ObjectName) {
        self.silenced.lock().retain(|(resource, _)| resource != name);
    }

    fn stats(&self, _ctx: &SampleContext, stats: &mut BTreeMap<String, AttrValue>) {
        stats.insert(STAT_UNSUPPORTED_COUNT.into(), self.unsupported_count().into());
        stats.insert(STAT_FORCE_OBJECT_NAME.into(), self.force_object_name.into());
        stats.insert(STAT_SILENCE_SET_COUNT.into(), self.silenced_count().into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InMemoryRegistry, ResourceRegistry};
    use crate::sample::Resource;
    use std::collections::HashSet;
    use std::sync::Arc;
    use streamx_common::{AttributeDescriptor, Composite, ObjectName};

    fn sample_for(registry: &Arc<InMemoryRegistry>, name: &ObjectName) -> AttributeSample {
        let descriptors = registry.descriptors(name).unwrap();
        let resource = Arc::new(Resource::new(name.clone(), descriptors, 0));
        AttributeSample::new(resource, registry.clone(), &HashSet::new(), 0, "svc")
    }

    #[test]
    fn test_unreadable_attributes_are_excluded() {
        let registry = Arc::new(InMemoryRegistry::new("test"));
        let name: ObjectName = "svc:name=X".parse().unwrap();
        registry.register(
            name.clone(),
            vec![
                (AttributeDescriptor::scalar("Count"), 5.into()),
                (AttributeDescriptor::scalar("Secret").write_only(), "pw".into()),
            ],
        );
        let ctx = SampleContext::new(registry.clone());
        let listener = FlatteningListener::new(Flattener::default(), false);

        let mut sample = sample_for(&registry, &name);
        listener.pre_sample(&ctx, &mut sample);
        assert!(sample.is_excluded("Secret"));
        assert_eq!(sample.attributes_to_sample(), vec!["Count".to_string()]);
    }

    #[test]
    fn test_post_sample_flattens_and_forces_object_name() {
        let registry = Arc::new(InMemoryRegistry::new("test"));
        let name = registry
            .register_values(
                "svc:name=X",
                vec![
                    ("Count", 5.into()),
                    ("Heap", Composite::new().with("used", 1).into()),
                ],
            )
            .unwrap();
        let ctx = SampleContext::new(registry.clone());
        let listener = FlatteningListener::new(Flattener::default(), true);

        let mut sample = sample_for(&registry, &name);
        sample.sample();
        listener.post_sample(&ctx, &mut sample).unwrap();

        let snap = sample.snapshot();
        assert_eq!(snap.get("Count"), Some(&AttrValue::Int(5)));
        assert_eq!(snap.get("Heap\\used"), Some(&AttrValue::Int(1)));
        let forced = snap.get_ignore_case(OBJECT_NAME_PROPERTY).unwrap();
        assert!(forced.transient);
        assert_eq!(forced.value, AttrValue::from("svc:name=X"));
    }

    #[test]
    fn test_failed_attribute_is_silenced_on_later_samples() {
        let registry = Arc::new(InMemoryRegistry::new("test"));
        let name = registry
            .register_values("svc:name=X", vec![("Count", 5.into()), ("Flaky", 1.into())])
            .unwrap();
        registry.fail_attribute(&name, "Flaky", crate::error::RegistryError::other("flaky"));
        let ctx = SampleContext::new(registry.clone());
        let listener = FlatteningListener::new(Flattener::default(), false);

        let mut first = sample_for(&registry, &name);
        listener.pre_sample(&ctx, &mut first);
        assert!(!first.is_silenced("Flaky"));
        first.sample();
        assert!(!first.error_is_silenced());
        listener.sample_error(&ctx, &first, Severity::Warning);
        assert_eq!(listener.silenced_count(), 1);

        let mut second = sample_for(&registry, &name);
        listener.pre_sample(&ctx, &mut second);
        assert!(second.is_silenced("Flaky"));
        assert!(!second.is_silenced("Count"));
        second.sample();
        assert!(second.error_is_silenced());

        let mut stats = BTreeMap::new();
        listener.stats(&ctx, &mut stats);
        assert_eq!(stats.get(STAT_SILENCE_SET_COUNT), Some(&AttrValue::UInt(1)));

        listener.unregister(&ctx, &name);
        assert_eq!(listener.silenced_count(), 0);
    }

    #[test]
    fn test_unsupported_value_is_reported_after_the_rest() {
        let registry = Arc::new(InMemoryRegistry::new("test"));
        let name = registry
            .register_values(
                "svc:name=X",
                vec![
                    ("Thread", AttrValue::Opaque { type_name: "Thread".into() }),
                    ("Count", 5.into()),
                ],
            )
            .unwrap();
        let ctx = SampleContext::new(registry.clone());
        let listener = FlatteningListener::new(Flattener::default(), false);

        let mut sample = sample_for(&registry, &name);
        sample.sample();
        let err = listener.post_sample(&ctx, &mut sample).unwrap_err();

        assert_eq!(err.attribute(), Some("Thread"));
        assert_eq!(sample.snapshot().len(), 1);
        assert_eq!(listener.unsupported_count(), 1);
    }
}
