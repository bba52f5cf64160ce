use crate::activity::Activity;
use crate::conditions::{self, AttributeAction, AttributeCondition, ConditionRegistry};
use crate::config::SamplerConfig;
use crate::context::SampleContext;
use crate::error::{RegistryErrorKind, Result, SampleError, StreamxError};
use crate::listener::SampleListener;
use crate::registry::{RegistryChangeListener, RegistryEvent, ResourceRegistry};
use crate::sample::{AttributeSample, Resource};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use streamx_common::{AttrValue, ObjectName, ObjectNamePattern, Severity, Snapshot};

pub const STAT_NOOP_COUNT: &str = "noop.count";
pub const STAT_SAMPLE_COUNT: &str = "sample.count";
pub const STAT_ERROR_COUNT: &str = "total.error.count";
pub const STAT_EXCLUDE_COUNT: &str = "total.exclude.count";
pub const STAT_RESOURCE_COUNT: &str = "resource.count";
pub const STAT_CONDITION_COUNT: &str = "condition.count";
pub const STAT_LISTENER_COUNT: &str = "listener.count";
pub const STAT_ACTION_COUNT: &str = "total.action.count";
pub const STAT_TOTAL_METRIC_COUNT: &str = "total.metric.count";
pub const STAT_LAST_METRIC_COUNT: &str = "last.metric.count";
pub const STAT_SAMPLE_TIME_USEC: &str = "sample.time.usec";

/// Name of the statistics snapshot appended to every sampled activity.
pub const STATS_SNAPSHOT_NAME: &str = "SampleContext";

struct Filters {
    include: Vec<ObjectNamePattern>,
    exclude: Vec<ObjectNamePattern>,
}

impl Filters {
    fn accepts(&self, name: &ObjectName) -> bool {
        self.include.iter().any(|p| p.matches(name)) && !self.exclude.iter().any(|p| p.matches(name))
    }
}

/// State shared with the registry's change notifications.
struct Shared {
    name: String,
    registry: Arc<dyn ResourceRegistry>,
    config: SamplerConfig,
    filters: Filters,
    resources: DashMap<ObjectName, Arc<Resource>>,
    next_seq: AtomicU64,
    exclusions: DashMap<ObjectName, HashSet<String>>,
    listeners: RwLock<Vec<Arc<dyn SampleListener>>>,
    conditions: RwLock<ConditionRegistry>,
    context: SampleContext,
}

impl Shared {
    fn listeners(&self) -> Vec<Arc<dyn SampleListener>> {
        self.listeners.read().clone()
    }

    fn report_error(&self, error: StreamxError) {
        self.context.incr_error_count();
        self.context.set_last_error(Some(error.to_string()));
        tracing::warn!(sampler = %self.name, error = %error, "Sampling error");
        for listener in self.listeners() {
            listener.error(&self.context, &error);
        }
    }

    /// Adds a resource to the map and announces it. Returns `false` if it was
    /// already known or its metadata could not be read.
    fn add_resource(&self, name: ObjectName) -> bool {
        if self.resources.contains_key(&name) {
            return false;
        }
        let descriptors = match self.registry.descriptors(&name) {
            Ok(descriptors) => descriptors,
            Err(err) => {
                self.report_error(err.into());
                return false;
            }
        };

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let inserted = match self.resources.entry(name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Resource::new(name.clone(), descriptors, seq)));
                true
            }
        };
        if inserted {
            self.context.set_resource_count(self.resources.len());
            tracing::debug!(sampler = %self.name, resource = %name, "Resource registered");
            for listener in self.listeners() {
                listener.register(&self.context, &name);
            }
        }
        inserted
    }

    fn remove_resource(&self, name: &ObjectName) -> bool {
        if self.resources.remove(name).is_none() {
            return false;
        }
        self.context.set_resource_count(self.resources.len());
        tracing::debug!(sampler = %self.name, resource = %name, "Resource unregistered");
        for listener in self.listeners() {
            listener.unregister(&self.context, name);
        }
        true
    }

    fn on_change(&self, event: RegistryEvent) {
        match event {
            RegistryEvent::Registered(name) => {
                if self.filters.accepts(&name) {
                    self.add_resource(name);
                }
            }
            RegistryEvent::Unregistered(name) => {
                self.remove_resource(&name);
            }
        }
    }
}

/// Forwards registry events to the handler for as long as it exists.
struct ChangeBridge {
    shared: Weak<Shared>,
}

impl RegistryChangeListener for ChangeBridge {
    fn on_change(&self, event: RegistryEvent) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_change(event);
        }
    }
}

#[derive(Default)]
struct CycleState {
    subscription: Option<Arc<dyn RegistryChangeListener>>,
    subscribe_attempted: bool,
    closed: bool,
}

impl CycleState {
    /// `true` once the registry turned out not to push change events.
    fn polls_registry(&self) -> bool {
        self.subscribe_attempted && self.subscription.is_none()
    }
}

/// Runs sampling cycles for one sampler.
///
/// A cycle is driven by [`started`](Self::started) and
/// [`stopped`](Self::stopped). Both run under one reentrant cycle lock so
/// cycles never overlap, and [`cleanup`](Self::cleanup) waits for an
/// in-flight cycle to finish. Resources are discovered on the first cycle
/// and kept current through registry change events when the registry
/// offers them. Otherwise every cycle reconciles the resource map against
/// a fresh query.
pub struct SampleHandler {
    shared: Arc<Shared>,
    cycle: ReentrantMutex<RefCell<CycleState>>,
}

impl SampleHandler {
    pub fn new(
        name: impl Into<String>,
        registry: Arc<dyn ResourceRegistry>,
        config: SamplerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let filters = Filters {
            include: config.include_patterns()?,
            exclude: config.exclude_patterns()?,
        };
        let context = SampleContext::new(registry.clone());
        Ok(Self {
            shared: Arc::new(Shared {
                name: name.into(),
                registry,
                config,
                filters,
                resources: DashMap::new(),
                next_seq: AtomicU64::new(0),
                exclusions: DashMap::new(),
                listeners: RwLock::new(Vec::new()),
                conditions: RwLock::new(ConditionRegistry::new()),
                context,
            }),
            cycle: ReentrantMutex::new(RefCell::new(CycleState::default())),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.shared.config
    }

    pub fn context(&self) -> &SampleContext {
        &self.shared.context
    }

    pub fn registry(&self) -> &Arc<dyn ResourceRegistry> {
        &self.shared.registry
    }

    pub fn add_listener(&self, listener: Arc<dyn SampleListener>) {
        self.shared.listeners.write().push(listener);
    }

    /// Removes a listener by identity. Returns `true` if it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn SampleListener>) -> bool {
        let mut listeners = self.shared.listeners.write();
        let before = listeners.len();
        listeners.retain(|existing| !Arc::ptr_eq(existing, listener));
        listeners.len() < before
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.read().len()
    }

    /// Registers a condition, replacing any condition with the same name.
    pub fn register(&self, condition: Arc<dyn AttributeCondition>, action: Option<Arc<dyn AttributeAction>>) {
        self.shared.conditions.write().register(condition, action);
    }

    pub fn unregister_condition(&self, name: &str) -> bool {
        self.shared.conditions.write().remove(name)
    }

    pub fn condition_count(&self) -> usize {
        self.shared.conditions.read().len()
    }

    /// `true` if `name` passes the include and exclude filters.
    pub fn accepts(&self, name: &ObjectName) -> bool {
        self.shared.filters.accepts(name)
    }

    /// Names in the resource map, in sampling order.
    pub fn resource_names(&self) -> Vec<ObjectName> {
        self.ordered_resources()
            .into_iter()
            .map(|r| r.name().clone())
            .collect()
    }

    pub fn resource_count(&self) -> usize {
        self.shared.resources.len()
    }

    /// Attributes of `name` excluded for good after failing.
    pub fn permanent_excludes(&self, name: &ObjectName) -> Vec<String> {
        let mut excluded: Vec<String> = self
            .shared
            .exclusions
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        excluded.sort();
        excluded
    }

    /// Zeroes the context counters between cycles.
    pub fn reset_counters(&self) -> &SampleContext {
        let _guard = self.cycle.lock();
        self.shared.context.reset();
        &self.shared.context
    }

    pub fn is_closed(&self) -> bool {
        self.cycle.lock().borrow().closed
    }

    /// Begins a cycle: clears the last error, runs `pre_activity` and
    /// discovers resources if none are known yet or the registry has to be
    /// polled for changes.
    pub fn started(&self, activity: &mut Activity) {
        let guard = self.cycle.lock();
        if guard.borrow().closed {
            return;
        }
        let ctx = &self.shared.context;
        ctx.set_last_error(None);

        for listener in self.shared.listeners() {
            listener.pre_activity(ctx, activity);
        }
        if activity.is_noop() {
            ctx.incr_noop_count();
        }
        let polls = guard.borrow().polls_registry();
        if polls || self.shared.resources.is_empty() {
            self.discover(&guard);
        }
    }

    /// Ends a cycle: samples every resource, runs `aggregate` and
    /// `post_activity`, then appends the statistics snapshot. No-op activities are left alone.
    pub fn stopped(&self, activity: &mut Activity) {
        let guard = self.cycle.lock();
        if guard.borrow().closed || activity.is_noop() {
            return;
        }
        let ctx = &self.shared.context;
        let begin = Instant::now();
        ctx.incr_sample_count();

        let metrics = self.sample_resources(activity);
        ctx.record_metrics(metrics, begin.elapsed().as_micros() as i64);

        let listeners = self.shared.listeners();
        for listener in &listeners {
            listener.aggregate(ctx, activity);
        }
        for listener in &listeners {
            listener.post_activity(ctx, activity);
        }

        let stats = self.stats_snapshot(activity);
        activity.add_snapshot(stats);

        tracing::debug!(
            sampler = %self.shared.name,
            activity_id = activity.id(),
            metrics,
            snapshots = activity.snapshots().len(),
            "Sampling cycle finished"
        );
    }

    /// Releases the resource map, the permanent exclusions and the
    /// conditions. Waits for an in-flight cycle; later cycles do nothing.
    pub fn cleanup(&self) {
        let guard = self.cycle.lock();
        let subscription = {
            let mut state = guard.borrow_mut();
            if state.closed {
                return;
            }
            state.closed = true;
            state.subscription.take()
        };
        if let Some(subscription) = subscription {
            self.shared.registry.unsubscribe(&subscription);
        }
        self.shared.exclusions.clear();
        self.shared.conditions.write().clear();
        self.shared.resources.clear();
        self.shared.context.set_resource_count(0);
        tracing::info!(sampler = %self.shared.name, "Sample handler closed");
    }

    fn discover(&self, state: &RefCell<CycleState>) {
        let shared = &self.shared;

        if !state.borrow().subscribe_attempted {
            state.borrow_mut().subscribe_attempted = true;
            let bridge: Arc<dyn RegistryChangeListener> = Arc::new(ChangeBridge {
                shared: Arc::downgrade(shared),
            });
            match shared.registry.subscribe(bridge.clone()) {
                Ok(true) => state.borrow_mut().subscription = Some(bridge),
                Ok(false) => {
                    tracing::debug!(sampler = %shared.name, "Registry does not push change events")
                }
                Err(err) => shared.report_error(err.into()),
            }
        }

        let mut added = 0;
        let mut seen = HashSet::new();
        let mut complete = true;
        for pattern in &shared.filters.include {
            let names = match shared.registry.query_names(pattern) {
                Ok(names) => names,
                Err(err) => {
                    shared.report_error(err.into());
                    complete = false;
                    break;
                }
            };
            for name in names {
                if !shared.filters.accepts(&name) {
                    continue;
                }
                seen.insert(name.clone());
                if shared.add_resource(name) {
                    added += 1;
                }
            }
        }

        // without change events, names missing from a complete answer are gone
        let mut removed = 0;
        if complete && state.borrow().polls_registry() {
            let stale: Vec<ObjectName> = shared
                .resources
                .iter()
                .filter(|entry| !seen.contains(entry.key()))
                .map(|entry| entry.key().clone())
                .collect();
            for name in stale {
                if shared.remove_resource(&name) {
                    removed += 1;
                }
            }
        }

        shared.context.set_resource_count(shared.resources.len());
        if added > 0 || removed > 0 {
            tracing::info!(
                sampler = %shared.name,
                registry = shared.registry.name(),
                added,
                removed,
                resources = shared.resources.len(),
                "Resource discovery finished"
            );
        } else {
            tracing::debug!(
                sampler = %shared.name,
                resources = shared.resources.len(),
                "Resource map unchanged"
            );
        }
    }

    fn ordered_resources(&self) -> Vec<Arc<Resource>> {
        let mut resources: Vec<Arc<Resource>> = self
            .shared
            .resources
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        resources.sort_by_key(|r| r.seq());
        resources
    }

    fn sample_resources(&self, activity: &mut Activity) -> usize {
        let shared = &self.shared;
        let ctx = &shared.context;
        let listeners = shared.listeners();
        let conditions = shared.conditions.read().entries();
        let mut metrics = 0;

        for resource in self.ordered_resources() {
            let permanent = shared
                .exclusions
                .get(resource.name())
                .map(|set| set.value().clone())
                .unwrap_or_default();
            let mut sample = AttributeSample::new(
                resource.clone(),
                shared.registry.clone(),
                &permanent,
                shared.config.batch_size,
                activity.name(),
            );

            for listener in &listeners {
                listener.pre_sample(ctx, &mut sample);
            }

            let mut lost_connection = false;
            if sample.has_attributes_to_sample() {
                sample.sample();
                let read_error = sample.error().cloned();

                for listener in &listeners {
                    if let Err(err) = listener.post_sample(ctx, &mut sample) {
                        sample.set_error(err);
                        self.on_sample_error(&sample, Severity::Error, &listeners);
                    }
                }

                match read_error {
                    Some(err) if err.is_connection_lost() => {
                        lost_connection = true;
                        sample.set_error(err.clone());
                        for listener in &listeners {
                            listener.sample_error(ctx, &sample, Severity::Critical);
                        }
                        shared.report_error(err.into());
                    }
                    Some(err) if is_vanished(&err) => {
                        tracing::info!(
                            sampler = %shared.name,
                            resource = %resource.name(),
                            error = %err,
                            "Resource vanished, dropping it"
                        );
                        shared.remove_resource(resource.name());
                        continue;
                    }
                    Some(err) => {
                        sample.set_error(err);
                        self.on_sample_error(&sample, Severity::Warning, &listeners);
                    }
                    None => {}
                }
            } else {
                ctx.incr_noop_count();
            }

            ctx.add_exclude_attr_count(sample.excludes().len());
            conditions::evaluate_all(&conditions, ctx, &sample);

            if lost_connection {
                tracing::warn!(
                    sampler = %shared.name,
                    resource = %resource.name(),
                    "Connection lost, skipping the remaining resources"
                );
                break;
            }

            let mut snapshot = sample.into_snapshot();
            if snapshot.is_empty() {
                continue;
            }
            snapshot.make_keys_unique(&shared.config.path_delimiter, &shared.config.unique_suffix);
            for listener in &listeners {
                listener.complete(ctx, activity, resource.name(), &snapshot);
            }
            metrics += snapshot.len();
            activity.add_snapshot(snapshot);
        }

        metrics
    }

    /// Reports a failed sample and applies the exclude-on-error policy.
    ///
    /// Classified registry failures and failures of severity `Error` or
    /// higher exclude the attribute named by the error for good, or every
    /// attribute of the sample when the error names none.
    fn on_sample_error(&self, sample: &AttributeSample, severity: Severity, listeners: &[Arc<dyn SampleListener>]) {
        let shared = &self.shared;
        let ctx = &shared.context;
        let Some(err) = sample.error() else {
            return;
        };

        ctx.incr_error_count();
        ctx.set_last_error(Some(err.to_string()));
        if sample.error_is_silenced() {
            tracing::debug!(
                sampler = %shared.name,
                resource = %sample.name(),
                %severity,
                error = %err,
                "Sampling failed again"
            );
        } else {
            tracing::warn!(
                sampler = %shared.name,
                resource = %sample.name(),
                %severity,
                error = %err,
                "Sampling failed"
            );
        }
        for listener in listeners {
            listener.sample_error(ctx, sample, severity);
        }

        if !shared.config.exclude_on_error {
            return;
        }
        let classified = err.kind().is_some_and(|k| k.excludes_attribute());
        if !classified && !severity.is_hard() {
            return;
        }
        let attributes = match err.attribute() {
            Some(attribute) => vec![attribute.to_string()],
            None => sample.attributes_to_sample(),
        };
        tracing::info!(
            sampler = %shared.name,
            resource = %sample.name(),
            attributes = ?attributes,
            "Excluding attributes after error"
        );
        shared
            .exclusions
            .entry(sample.name().clone())
            .or_default()
            .extend(attributes);
    }

    fn stats_snapshot(&self, activity: &Activity) -> Snapshot {
        let ctx = &self.shared.context;
        let mut snapshot = Snapshot::new(activity.name(), STATS_SNAPSHOT_NAME);
        snapshot.add(STAT_NOOP_COUNT, ctx.noop_count());
        snapshot.add(STAT_SAMPLE_COUNT, ctx.sample_count());
        snapshot.add(STAT_ERROR_COUNT, ctx.error_count());
        snapshot.add(STAT_EXCLUDE_COUNT, ctx.exclude_attr_count());
        snapshot.add(STAT_RESOURCE_COUNT, self.shared.resources.len());
        snapshot.add(STAT_CONDITION_COUNT, self.condition_count());
        snapshot.add(STAT_LISTENER_COUNT, self.listener_count());
        snapshot.add(STAT_ACTION_COUNT, ctx.action_count());
        snapshot.add(STAT_TOTAL_METRIC_COUNT, ctx.total_metric_count());
        snapshot.add(STAT_LAST_METRIC_COUNT, ctx.last_metric_count());
        snapshot.add(STAT_SAMPLE_TIME_USEC, ctx.last_sample_usec());

        let mut extra: BTreeMap<String, AttrValue> = BTreeMap::new();
        for listener in self.shared.listeners() {
            listener.stats(ctx, &mut extra);
        }
        for (key, value) in extra {
            snapshot.add(key, value);
        }
        snapshot
    }
}

/// A whole-request not-found failure means the resource itself is gone.
fn is_vanished(err: &SampleError) -> bool {
    err.kind() == Some(RegistryErrorKind::NotFound) && err.attribute().is_none()
}

impl std::fmt::Debug for SampleHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleHandler")
            .field("name", &self.shared.name)
            .field("resources", &self.shared.resources.len())
            .field("context", &self.shared.context)
            .finish()
    }
}
