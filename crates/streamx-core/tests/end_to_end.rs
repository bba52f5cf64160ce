use std::sync::Arc;
use std::time::Duration;
use streamx_common::{AttrValue, Composite, Snapshot, Tabular};
use streamx_core::handler::{STATS_SNAPSHOT_NAME, STAT_ERROR_COUNT, STAT_EXCLUDE_COUNT, STAT_SAMPLE_COUNT};
use streamx_core::registry::{InMemoryRegistry, ResourceRegistry};
use streamx_core::{Activity, RegistryError, Sampler, SamplerConfig};

fn resource<'a>(activity: &'a Activity, name: &str) -> &'a Snapshot {
    activity
        .snapshots()
        .iter()
        .find(|s| s.name() == name)
        .unwrap_or_else(|| panic!("no snapshot for {name}"))
}

fn scheduled(registry: &Arc<InMemoryRegistry>, config: SamplerConfig) -> Sampler {
    let registry: Arc<dyn ResourceRegistry> = registry.clone();
    let mut sampler = Sampler::new("svc-sampler", registry);
    sampler.set_schedule(config).unwrap();
    sampler
}

#[tokio::test]
async fn single_resource_cycle_produces_flat_snapshot() {
    let registry = Arc::new(InMemoryRegistry::new("local"));
    registry
        .register_values(
            "svc:name=X",
            vec![("Count", 5.into()), ("Detail", Composite::key_value("k1", 42).into())],
        )
        .unwrap();

    let sampler = scheduled(&registry, SamplerConfig::new("svc:*", Duration::from_millis(1000)));
    let activity = sampler.sample_once().await.unwrap();

    let snap = resource(&activity, "svc:name=X");
    assert_eq!(snap.len(), 2);
    assert_eq!(snap.get("Count"), Some(&AttrValue::Int(5)));
    assert_eq!(snap.get("Detail\\k1"), Some(&AttrValue::Int(42)));

    let ctx = sampler.handler().unwrap().context();
    assert_eq!(ctx.sample_count(), 1);
    assert_eq!(ctx.error_count(), 0);
    assert_eq!(ctx.exclude_attr_count(), 0);

    let stats = resource(&activity, STATS_SNAPSHOT_NAME);
    assert_eq!(stats.get(STAT_SAMPLE_COUNT), Some(&AttrValue::UInt(1)));
    assert_eq!(stats.get(STAT_ERROR_COUNT), Some(&AttrValue::UInt(0)));
    assert_eq!(stats.get(STAT_EXCLUDE_COUNT), Some(&AttrValue::UInt(0)));
}

#[tokio::test]
async fn tabular_rows_are_indexed_from_one() {
    let registry = Arc::new(InMemoryRegistry::new("local"));
    let rows = Tabular::new(vec![
        Composite::new().with("a", 1).into(),
        Composite::new().with("a", 2).into(),
    ]);
    registry.register_values("svc:name=T", vec![("Rows", rows.into())]).unwrap();

    let sampler = scheduled(&registry, SamplerConfig::default());
    let activity = sampler.sample_once().await.unwrap();

    let snap = resource(&activity, "svc:name=T");
    let keys: Vec<&str> = snap.properties().iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["Rows\\01\\a", "Rows\\02\\a"]);
    assert_eq!(snap.get("Rows\\02\\a"), Some(&AttrValue::Int(2)));
}

#[tokio::test]
async fn nested_depth_matches_token_count() {
    let registry = Arc::new(InMemoryRegistry::new("local"));
    let deep = Composite::new().with(
        "l1",
        Composite::new().with("l2", Composite::new().with("l3", 7)),
    );
    registry.register_values("svc:name=D", vec![("Deep", deep.into())]).unwrap();

    let sampler = scheduled(&registry, SamplerConfig::default());
    let activity = sampler.sample_once().await.unwrap();

    let snap = resource(&activity, "svc:name=D");
    let key = &snap.properties()[0].key;
    assert_eq!(key, "Deep\\l1\\l2\\l3");
    assert_eq!(key.split('\\').count(), 4);
}

#[tokio::test]
async fn one_failing_resource_does_not_stop_the_others() {
    let registry = Arc::new(InMemoryRegistry::new("local"));
    let r1 = registry.register_values("svc:name=R1", vec![("X", 1.into())]).unwrap();
    for name in ["svc:name=R2", "svc:name=R3", "svc:name=R4"] {
        registry.register_values(name, vec![("X", 2.into())]).unwrap();
    }
    registry.fail_next_get(&r1, RegistryError::other("read timed out"));

    let sampler = scheduled(&registry, SamplerConfig::default());
    let activity = sampler.sample_once().await.unwrap();

    for name in ["svc:name=R2", "svc:name=R3", "svc:name=R4"] {
        assert_eq!(resource(&activity, name).get("X"), Some(&AttrValue::Int(2)));
    }
    assert!(activity.snapshots().iter().all(|s| s.name() != "svc:name=R1"));
    assert_eq!(sampler.handler().unwrap().context().error_count(), 1);
}

#[tokio::test]
async fn excluded_attribute_stays_excluded_after_rediscovery() {
    let registry = Arc::new(InMemoryRegistry::new("local"));
    let name = registry
        .register_values("svc:name=X", vec![("Good", 1.into()), ("Broken", 2.into())])
        .unwrap();
    registry.fail_attribute(&name, "Broken", RegistryError::unsupported("opaque type"));

    let sampler = scheduled(&registry, SamplerConfig::default());
    let handler = sampler.handler().unwrap().clone();
    sampler.sample_once().await.unwrap();
    assert_eq!(handler.permanent_excludes(&name), vec!["Broken".to_string()]);

    // drop and re-add the resource so the next cycle reads fresh descriptors
    registry.unregister(&name);
    registry
        .register_values("svc:name=X", vec![("Good", 1.into()), ("Broken", 2.into())])
        .unwrap();
    assert_eq!(handler.resource_count(), 1);

    for _ in 0..3 {
        let activity = sampler.sample_once().await.unwrap();
        assert_eq!(registry.last_request(&name), Some(vec!["Good".to_string()]));
        assert_eq!(resource(&activity, "svc:name=X").get("Good"), Some(&AttrValue::Int(1)));
    }
}

#[tokio::test]
async fn sampler_requires_a_schedule() {
    let registry: Arc<dyn ResourceRegistry> = Arc::new(InMemoryRegistry::new("local"));
    let mut sampler = Sampler::new("unscheduled", registry);

    assert!(sampler.run().is_err());
    assert!(sampler.sample_once().await.is_err());

    sampler.set_schedule(SamplerConfig::default()).unwrap();
    assert!(sampler.set_schedule(SamplerConfig::default()).is_err());
}

#[tokio::test]
async fn force_object_name_adds_transient_property() {
    let registry = Arc::new(InMemoryRegistry::new("local"));
    registry.register_values("svc:name=X", vec![("Count", 5.into())]).unwrap();

    let config = SamplerConfig {
        force_object_name: true,
        trace: true,
        ..SamplerConfig::default()
    };
    let sampler = scheduled(&registry, config);
    assert_eq!(sampler.handler().unwrap().listener_count(), 2);

    let activity = sampler.sample_once().await.unwrap();
    let property = resource(&activity, "svc:name=X")
        .get_ignore_case("objectname")
        .unwrap();
    assert!(property.transient);
    assert_eq!(property.value, AttrValue::from("svc:name=X"));
}
