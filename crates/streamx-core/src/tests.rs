use crate::activity::Activity;
use crate::conditions::{AttributeAction, AttributeCondition, CompareOp, FnCondition, SimpleCondition};
use crate::config::SamplerConfig;
use crate::context::SampleContext;
use crate::error::{RegistryError, SampleError, StreamxError};
use crate::handler::{self, SampleHandler};
use crate::listener::{AggregatorConfig, FlatteningListener, SampleListener, SnapshotAggregator};
use crate::registry::{InMemoryRegistry, ResourceRegistry};
use crate::sample::AttributeSample;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use streamx_common::{
    AttrValue, AttributeDescriptor, Composite, ObjectName, ObjectNamePattern, Severity, Snapshot, Tabular,
};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    noop: bool,
}

impl Recorder {
    fn noop() -> Self {
        Self {
            noop: true,
            ..Self::default()
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl SampleListener for Recorder {
    fn register(&self, _ctx: &SampleContext, name: &ObjectName) {
        self.push(format!("register {name}"));
    }

    fn unregister(&self, _ctx: &SampleContext, name: &ObjectName) {
        self.push(format!("unregister {name}"));
    }

    fn pre_activity(&self, _ctx: &SampleContext, activity: &mut Activity) {
        if self.noop {
            activity.mark_noop();
        }
        self.push("pre_activity".into());
    }

    fn pre_sample(&self, _ctx: &SampleContext, sample: &mut AttributeSample) {
        self.push(format!("pre_sample {}", sample.name()));
    }

    fn post_sample(&self, _ctx: &SampleContext, sample: &mut AttributeSample) -> Result<(), SampleError> {
        self.push(format!("post_sample {}", sample.name()));
        Ok(())
    }

    fn complete(&self, _ctx: &SampleContext, _activity: &Activity, name: &ObjectName, _snapshot: &Snapshot) {
        self.push(format!("complete {name}"));
    }

    fn sample_error(&self, _ctx: &SampleContext, sample: &AttributeSample, severity: Severity) {
        self.push(format!("sample_error {} {severity}", sample.name()));
    }

    fn error(&self, _ctx: &SampleContext, error: &StreamxError) {
        self.push(format!("error {error}"));
    }

    fn post_activity(&self, _ctx: &SampleContext, _activity: &Activity) {
        self.push("post_activity".into());
    }

    fn stats(&self, _ctx: &SampleContext, stats: &mut BTreeMap<String, AttrValue>) {
        stats.insert("recorder.events".into(), self.events.lock().len().into());
    }
}

struct CountingAction(AtomicUsize);

impl AttributeAction for CountingAction {
    fn apply(&self, _: &SampleContext, _: &dyn AttributeCondition, _: &AttributeSample) -> Option<AttrValue> {
        Some(self.0.fetch_add(1, Ordering::Relaxed).into())
    }
}

fn handler_with(registry: &Arc<InMemoryRegistry>, config: SamplerConfig) -> SampleHandler {
    let handler = SampleHandler::new("test", registry.clone(), config).unwrap();
    handler.add_listener(Arc::new(FlatteningListener::new(Default::default(), false)));
    handler
}

fn cycle(handler: &SampleHandler) -> Activity {
    let mut activity = Activity::new("test");
    handler.started(&mut activity);
    activity.stop();
    handler.stopped(&mut activity);
    activity
}

fn resource_snapshot<'a>(activity: &'a Activity, name: &str) -> Option<&'a Snapshot> {
    activity.snapshots().iter().find(|s| s.name() == name)
}

fn stats(activity: &Activity) -> &Snapshot {
    activity
        .snapshots()
        .last()
        .filter(|s| s.name() == handler::STATS_SNAPSHOT_NAME)
        .expect("stats snapshot is appended last")
}

#[test]
fn discovery_runs_once_and_honours_filters() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    registry.register_values("svc:name=A", vec![("Count", 1.into())]).unwrap();
    registry.register_values("svc:name=B", vec![("Count", 2.into())]).unwrap();
    registry.register_values("other:name=C", vec![("Count", 3.into())]).unwrap();

    let config = SamplerConfig {
        include_filter: "svc:*".into(),
        exclude_filter: "svc:name=B".into(),
        ..SamplerConfig::default()
    };
    let handler = handler_with(&registry, config);

    let activity = cycle(&handler);
    let names: Vec<String> = handler.resource_names().iter().map(ToString::to_string).collect();
    assert_eq!(names, vec!["svc:name=A".to_string()]);
    assert!(resource_snapshot(&activity, "svc:name=A").is_some());
    assert_eq!(handler.context().resource_count(), 1);
    assert_eq!(registry.subscriber_count(), 1);

    cycle(&handler);
    assert_eq!(registry.subscriber_count(), 1);
}

#[test]
fn listener_hooks_run_in_cycle_order() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    registry.register_values("svc:name=A", vec![("Count", 1.into())]).unwrap();
    let handler = handler_with(&registry, SamplerConfig::default());
    let recorder = Arc::new(Recorder::default());
    handler.add_listener(recorder.clone());

    let activity = cycle(&handler);

    assert_eq!(
        recorder.events(),
        vec![
            "pre_activity",
            "register svc:name=A",
            "pre_sample svc:name=A",
            "post_sample svc:name=A",
            "complete svc:name=A",
            "post_activity",
        ]
    );
    assert_eq!(stats(&activity).get("recorder.events"), Some(&AttrValue::UInt(6)));
}

#[test]
fn noop_activity_discovers_but_does_not_sample() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    registry.register_values("svc:name=A", vec![("Count", 1.into())]).unwrap();
    let handler = handler_with(&registry, SamplerConfig::default());
    handler.add_listener(Arc::new(Recorder::noop()));

    let activity = cycle(&handler);

    assert!(activity.snapshots().is_empty());
    assert_eq!(handler.resource_count(), 1);
    assert_eq!(handler.context().noop_count(), 1);
    assert_eq!(handler.context().sample_count(), 0);
    assert_eq!(registry.get_calls(), 0);
}

#[test]
fn stats_snapshot_reports_counters() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    registry
        .register_values(
            "svc:name=A",
            vec![("Count", 1.into()), ("Heap", Composite::new().with("used", 1).with("max", 2).into())],
        )
        .unwrap();
    let handler = handler_with(&registry, SamplerConfig::default());

    cycle(&handler);
    let activity = cycle(&handler);
    let stats = stats(&activity);

    assert_eq!(stats.get(handler::STAT_SAMPLE_COUNT), Some(&AttrValue::UInt(2)));
    assert_eq!(stats.get(handler::STAT_LAST_METRIC_COUNT), Some(&AttrValue::UInt(3)));
    assert_eq!(stats.get(handler::STAT_TOTAL_METRIC_COUNT), Some(&AttrValue::UInt(6)));
    assert_eq!(stats.get(handler::STAT_RESOURCE_COUNT), Some(&AttrValue::UInt(1)));
    assert_eq!(stats.get(handler::STAT_LISTENER_COUNT), Some(&AttrValue::UInt(1)));
    assert_eq!(stats.get(handler::STAT_ERROR_COUNT), Some(&AttrValue::UInt(0)));
    assert!(stats.get(handler::STAT_SAMPLE_TIME_USEC).is_some());
    assert!(stats.get("listener.unsupported.count").is_some());

    let ctx = handler.reset_counters();
    assert_eq!(ctx.sample_count(), 0);
    assert_eq!(ctx.total_metric_count(), 0);
}

#[test]
fn classified_attribute_error_excludes_only_that_attribute() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let name = registry
        .register_values("svc:name=A", vec![("Good", 1.into()), ("Gone", 2.into())])
        .unwrap();
    registry.fail_attribute(&name, "Gone", RegistryError::not_found("attribute vanished"));
    let handler = handler_with(&registry, SamplerConfig::default());

    let first = cycle(&handler);
    assert!(resource_snapshot(&first, "svc:name=A").is_none());
    assert_eq!(handler.permanent_excludes(&name), vec!["Gone".to_string()]);
    assert_eq!(handler.context().error_count(), 1);
    assert!(handler.context().last_error().is_some());

    let second = cycle(&handler);
    assert_eq!(registry.last_request(&name), Some(vec!["Good".to_string()]));
    let snap = resource_snapshot(&second, "svc:name=A").unwrap();
    assert_eq!(snap.get("Good"), Some(&AttrValue::Int(1)));
    assert_eq!(handler.context().error_count(), 1);
    assert!(handler.context().last_error().is_none());
}

#[test]
fn unattributed_classified_error_excludes_the_whole_request() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let name = registry
        .register_values("svc:name=A", vec![("X", 1.into()), ("Y", 2.into())])
        .unwrap();
    registry.fail_next_get(&name, RegistryError::unsupported("cannot encode"));
    let handler = handler_with(&registry, SamplerConfig::default());

    cycle(&handler);
    assert_eq!(handler.permanent_excludes(&name), vec!["X".to_string(), "Y".to_string()]);

    let calls = registry.get_calls();
    let activity = cycle(&handler);
    assert_eq!(registry.get_calls(), calls);
    assert!(resource_snapshot(&activity, "svc:name=A").is_none());
    assert_eq!(handler.context().noop_count(), 1);
}

#[test]
fn transient_error_is_retried() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let name = registry.register_values("svc:name=A", vec![("X", 1.into())]).unwrap();
    registry.fail_next_get(&name, RegistryError::other("timeout"));
    let handler = handler_with(&registry, SamplerConfig::default());
    let recorder = Arc::new(Recorder::default());
    handler.add_listener(recorder.clone());

    cycle(&handler);
    assert!(handler.permanent_excludes(&name).is_empty());
    assert!(recorder
        .events()
        .contains(&"sample_error svc:name=A warning".to_string()));

    let activity = cycle(&handler);
    assert!(resource_snapshot(&activity, "svc:name=A").is_some());
}

#[test]
fn exclude_on_error_can_be_disabled() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let name = registry.register_values("svc:name=A", vec![("X", 1.into())]).unwrap();
    registry.fail_next_get(&name, RegistryError::unsupported("cannot encode"));
    let config = SamplerConfig {
        exclude_on_error: false,
        ..SamplerConfig::default()
    };
    let handler = handler_with(&registry, config);

    cycle(&handler);
    assert!(handler.permanent_excludes(&name).is_empty());
    assert_eq!(handler.context().error_count(), 1);
}

#[test]
fn unsupported_value_is_excluded_after_first_failure() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let name = registry
        .register_values(
            "svc:name=A",
            vec![("Count", 1.into()), ("Thread", AttrValue::Opaque { type_name: "Thread".into() })],
        )
        .unwrap();
    let handler = handler_with(&registry, SamplerConfig::default());
    let recorder = Arc::new(Recorder::default());
    handler.add_listener(recorder.clone());

    let first = cycle(&handler);
    let snap = resource_snapshot(&first, "svc:name=A").unwrap();
    assert_eq!(snap.len(), 1);
    assert!(recorder.events().contains(&"sample_error svc:name=A error".to_string()));
    assert_eq!(handler.permanent_excludes(&name), vec!["Thread".to_string()]);

    cycle(&handler);
    assert_eq!(registry.last_request(&name), Some(vec!["Count".to_string()]));
    assert_eq!(handler.context().error_count(), 1);
}

#[test]
fn connection_loss_skips_remaining_resources() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let first = registry.register_values("svc:name=A", vec![("X", 1.into())]).unwrap();
    registry.register_values("svc:name=B", vec![("X", 2.into())]).unwrap();
    registry.fail_next_get(&first, RegistryError::connection_lost("socket closed"));
    let handler = handler_with(&registry, SamplerConfig::default());
    let recorder = Arc::new(Recorder::default());
    handler.add_listener(recorder.clone());

    let activity = cycle(&handler);

    assert_eq!(activity.snapshots().len(), 1);
    assert!(!recorder.events().contains(&"pre_sample svc:name=B".to_string()));
    let events = recorder.events();
    let sample_error = events
        .iter()
        .position(|e| e == "sample_error svc:name=A critical")
        .expect("sample hook notified");
    let error = events.iter().position(|e| e.starts_with("error ")).unwrap();
    assert!(sample_error < error);
    assert!(handler.permanent_excludes(&first).is_empty());
    assert_eq!(handler.context().error_count(), 1);

    let activity = cycle(&handler);
    assert_eq!(activity.snapshots().len(), 3);
}

#[test]
fn discovery_error_is_reported_and_retried() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    registry.register_values("svc:name=A", vec![("X", 1.into())]).unwrap();
    registry.fail_queries(RegistryError::other("registry unavailable"));
    let handler = handler_with(&registry, SamplerConfig::default());

    cycle(&handler);
    assert_eq!(handler.resource_count(), 0);
    assert_eq!(handler.context().error_count(), 1);

    registry.clear_faults();
    let activity = cycle(&handler);
    assert_eq!(handler.resource_count(), 1);
    assert!(resource_snapshot(&activity, "svc:name=A").is_some());
}

#[test]
fn registry_events_keep_resource_map_current() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    registry.register_values("svc:name=A", vec![("X", 1.into())]).unwrap();
    let config = SamplerConfig {
        include_filter: "svc:*".into(),
        ..SamplerConfig::default()
    };
    let handler = handler_with(&registry, config);
    let recorder = Arc::new(Recorder::default());
    handler.add_listener(recorder.clone());
    cycle(&handler);

    let b = registry.register_values("svc:name=B", vec![("X", 2.into())]).unwrap();
    registry.register_values("other:name=C", vec![("X", 3.into())]).unwrap();
    assert_eq!(handler.resource_count(), 2);
    assert!(recorder.events().contains(&"register svc:name=B".to_string()));

    registry.unregister(&b);
    assert_eq!(handler.resource_count(), 1);
    assert!(recorder.events().contains(&"unregister svc:name=B".to_string()));
}

/// Serves an in-memory registry without forwarding change events.
struct Unsubscribable(Arc<InMemoryRegistry>);

impl ResourceRegistry for Unsubscribable {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn query_names(&self, pattern: &ObjectNamePattern) -> Result<Vec<ObjectName>, RegistryError> {
        self.0.query_names(pattern)
    }

    fn descriptors(&self, name: &ObjectName) -> Result<Vec<AttributeDescriptor>, RegistryError> {
        self.0.descriptors(name)
    }

    fn get_attributes(
        &self,
        name: &ObjectName,
        attributes: &[String],
    ) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        self.0.get_attributes(name, attributes)
    }

    fn resource_count(&self) -> Result<usize, RegistryError> {
        self.0.resource_count()
    }
}

#[test]
fn registry_without_events_is_reconciled_every_cycle() {
    let inner = Arc::new(InMemoryRegistry::new("host"));
    inner.register_values("os:type=Cpu", vec![("Usage", 1.5.into())]).unwrap();
    let a = inner.register_values("os:type=Disk,name=a", vec![("Total", 10.into())]).unwrap();
    let registry = Arc::new(Unsubscribable(inner.clone()));
    let handler = SampleHandler::new("test", registry, SamplerConfig::default()).unwrap();
    handler.add_listener(Arc::new(FlatteningListener::new(Default::default(), false)));
    let recorder = Arc::new(Recorder::default());
    handler.add_listener(recorder.clone());
    cycle(&handler);
    assert_eq!(handler.resource_count(), 2);

    inner.register_values("os:type=Disk,name=b", vec![("Total", 20.into())]).unwrap();
    inner.unregister(&a);
    // nothing is pushed, the map only changes on the next cycle
    assert_eq!(handler.resource_count(), 2);

    for _ in 0..4 {
        cycle(&handler);
    }
    let activity = cycle(&handler);

    let names: Vec<String> = handler.resource_names().iter().map(ToString::to_string).collect();
    assert_eq!(names, vec!["os:type=Cpu".to_string(), "os:name=b,type=Disk".to_string()]);
    assert!(handler.permanent_excludes(&a).is_empty());
    assert!(resource_snapshot(&activity, "os:name=b,type=Disk").is_some());
    assert_eq!(handler.context().noop_count(), 0);
    assert_eq!(handler.context().error_count(), 0);

    let events = recorder.events();
    assert!(events.contains(&"register os:name=b,type=Disk".to_string()));
    assert!(events.contains(&"unregister os:name=a,type=Disk".to_string()));
}

#[test]
fn failed_query_does_not_drop_known_resources() {
    let inner = Arc::new(InMemoryRegistry::new("host"));
    inner.register_values("os:type=Cpu", vec![("Usage", 1.5.into())]).unwrap();
    let registry = Arc::new(Unsubscribable(inner.clone()));
    let handler = SampleHandler::new("test", registry, SamplerConfig::default()).unwrap();
    cycle(&handler);

    inner.fail_queries(RegistryError::other("registry busy"));
    cycle(&handler);
    assert_eq!(handler.resource_count(), 1);
    assert_eq!(handler.context().error_count(), 1);
}

#[test]
fn vanished_resource_is_dropped_not_excluded() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let name = registry
        .register_values("svc:name=A", vec![("X", 1.into()), ("Y", 2.into())])
        .unwrap();
    registry.register_values("svc:name=B", vec![("X", 3.into())]).unwrap();
    registry.fail_next_get(&name, RegistryError::not_found("gone"));
    let handler = handler_with(&registry, SamplerConfig::default());
    let recorder = Arc::new(Recorder::default());
    handler.add_listener(recorder.clone());

    let activity = cycle(&handler);

    assert!(resource_snapshot(&activity, "svc:name=A").is_none());
    assert!(resource_snapshot(&activity, "svc:name=B").is_some());
    assert!(handler.permanent_excludes(&name).is_empty());
    assert_eq!(handler.resource_count(), 1);
    assert_eq!(handler.context().error_count(), 0);
    assert!(recorder.events().contains(&"unregister svc:name=A".to_string()));
}

#[test]
fn repeated_failure_is_silenced_after_the_first() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let name = registry.register_values("svc:name=A", vec![("X", 1.into())]).unwrap();
    let handler = handler_with(&registry, SamplerConfig::default());
    let recorder = Arc::new(Recorder::default());
    handler.add_listener(recorder.clone());

    for _ in 0..3 {
        registry.fail_next_get(&name, RegistryError::other("timeout").for_attribute("X"));
        cycle(&handler);
    }

    assert_eq!(handler.context().error_count(), 3);
    assert!(handler.permanent_excludes(&name).is_empty());
    let activity = cycle(&handler);
    assert_eq!(
        stats(&activity).get("listener.silence.set.count"),
        Some(&AttrValue::UInt(1))
    );
}

#[test]
fn aggregated_snapshot_precedes_the_stats_snapshot() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    registry.register_values("svc:name=A", vec![("X", 1.into())]).unwrap();
    registry.register_values("svc:name=B", vec![("X", 2.into())]).unwrap();
    let handler = handler_with(&registry, SamplerConfig::default());
    let config: AggregatorConfig = serde_json::from_value(serde_json::json!({
        "snapshots": [{
            "name": "svc:Totals",
            "properties": [{ "name": "${name}.X", "resource": "svc:name=?", "attribute": "X", "where": { "name": "A|B" } }]
        }]
    }))
    .unwrap();
    handler.add_listener(Arc::new(SnapshotAggregator::new("totals", &config).unwrap()));

    let activity = cycle(&handler);

    let order: Vec<&str> = activity.snapshots().iter().map(Snapshot::name).collect();
    assert_eq!(
        order,
        vec!["svc:name=A", "svc:name=B", "svc:Totals", handler::STATS_SNAPSHOT_NAME]
    );
    let totals = activity.aggregates().next().unwrap();
    assert_eq!(totals.get("A.X"), Some(&AttrValue::Int(1)));
    assert_eq!(totals.get("B.X"), Some(&AttrValue::Int(2)));
    assert_eq!(
        stats(&activity).get("aggregator.totals.snapshot.count"),
        Some(&AttrValue::UInt(1))
    );
}

#[test]
fn resources_are_sampled_in_discovery_order() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    for name in ["svc:name=Z", "svc:name=M", "svc:name=A"] {
        registry.register_values(name, vec![("X", 1.into())]).unwrap();
    }
    let handler = handler_with(&registry, SamplerConfig::default());

    let activity = cycle(&handler);
    let order: Vec<&str> = activity.snapshots().iter().map(Snapshot::name).collect();
    assert_eq!(
        order,
        vec!["svc:name=Z", "svc:name=M", "svc:name=A", handler::STATS_SNAPSHOT_NAME]
    );
}

#[test]
fn branch_and_leaf_keys_are_made_unique() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let table = Tabular::new(vec![
        Composite::new().with("a", 1).into(),
        Composite::key_value("01", 7).into(),
    ]);
    registry.register_values("svc:name=A", vec![("T", table.into())]).unwrap();
    let handler = handler_with(&registry, SamplerConfig::default());

    let activity = cycle(&handler);
    let snap = resource_snapshot(&activity, "svc:name=A").unwrap();
    assert_eq!(snap.get("T\\01\\a"), Some(&AttrValue::Int(1)));
    assert_eq!(snap.get("T\\01_"), Some(&AttrValue::Int(7)));
}

#[test]
fn conditions_fire_actions_and_replace_by_name() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    registry.register_values("svc:name=A", vec![("Heap", 150.into())]).unwrap();
    registry.register_values("svc:name=B", vec![("Heap", 50.into())]).unwrap();
    let handler = handler_with(&registry, SamplerConfig::default());

    let action = Arc::new(CountingAction(AtomicUsize::new(0)));
    let high = SimpleCondition::new("heap-high", "svc:*".parse().unwrap(), "Heap", CompareOp::GreaterThan, 100.into());
    handler.register(Arc::new(high), Some(action.clone()));
    handler.register(Arc::new(FnCondition::new("always", |_: &AttributeSample| true)), None);
    assert_eq!(handler.condition_count(), 2);

    let activity = cycle(&handler);
    assert_eq!(action.0.load(Ordering::Relaxed), 1);
    assert_eq!(handler.context().action_count(), 3);
    assert_eq!(stats(&activity).get(handler::STAT_CONDITION_COUNT), Some(&AttrValue::UInt(2)));

    let low = SimpleCondition::new("heap-high", "svc:*".parse().unwrap(), "Heap", CompareOp::LessThan, 100.into());
    handler.register(Arc::new(low), Some(action.clone()));
    assert_eq!(handler.condition_count(), 2);
    cycle(&handler);
    assert_eq!(action.0.load(Ordering::Relaxed), 2);

    assert!(handler.unregister_condition("always"));
    assert_eq!(handler.condition_count(), 1);
}

#[test]
fn cleanup_releases_state_and_stops_cycles() {
    let registry = Arc::new(InMemoryRegistry::new("test"));
    let name = registry.register_values("svc:name=A", vec![("X", 1.into())]).unwrap();
    registry.fail_attribute(&name, "X", RegistryError::not_found("gone"));
    let handler = handler_with(&registry, SamplerConfig::default());
    cycle(&handler);
    assert_eq!(handler.permanent_excludes(&name).len(), 1);

    handler.cleanup();
    handler.cleanup();

    assert!(handler.is_closed());
    assert_eq!(handler.resource_count(), 0);
    assert!(handler.permanent_excludes(&name).is_empty());
    assert_eq!(registry.subscriber_count(), 0);

    let calls = registry.get_calls();
    let activity = cycle(&handler);
    assert!(activity.snapshots().is_empty());
    assert_eq!(registry.get_calls(), calls);
}

#[test]
fn handler_rejects_invalid_config() {
    let registry: Arc<dyn ResourceRegistry> = Arc::new(InMemoryRegistry::new("test"));
    let config = SamplerConfig {
        include_filter: "no-separator".into(),
        ..SamplerConfig::default()
    };
    assert!(matches!(
        SampleHandler::new("test", registry.clone(), config),
        Err(StreamxError::MalformedName(_))
    ));

    let config = SamplerConfig {
        path_delimiter: "!".into(),
        ..SamplerConfig::default()
    };
    assert!(matches!(
        SampleHandler::new("test", registry, config),
        Err(StreamxError::Config(_))
    ));
}
