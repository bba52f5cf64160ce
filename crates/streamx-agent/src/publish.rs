use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use streamx_common::{ObjectName, Snapshot};
use streamx_core::{Activity, SampleContext, SampleListener};

/// Hands completed snapshots downstream by logging them.
///
/// Each snapshot is logged at info level with its size; at debug level the
/// full snapshot is logged as JSON. Aggregated snapshots are published at
/// the end of the cycle.
pub struct PublishListener {
    agent_id: String,
    sampler: String,
    published: AtomicU64,
    properties: AtomicU64,
}

impl PublishListener {
    pub fn new(agent_id: impl Into<String>, sampler: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            sampler: sampler.into(),
            published: AtomicU64::new(0),
            properties: AtomicU64::new(0),
        }
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn properties(&self) -> u64 {
        self.properties.load(Ordering::Relaxed)
    }

    fn publish(&self, activity: &Activity, name: &dyn Display, snapshot: &Snapshot) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.properties
            .fetch_add(snapshot.len() as u64, Ordering::Relaxed);
        tracing::info!(
            agent_id = %self.agent_id,
            sampler = %self.sampler,
            activity = activity.id(),
            resource = %name,
            properties = snapshot.len(),
            "Snapshot published"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            match serde_json::to_string(snapshot) {
                Ok(json) => tracing::debug!(resource = %name, snapshot = %json, "Snapshot content"),
                Err(e) => tracing::warn!(resource = %name, error = %e, "Snapshot serialization failed"),
            }
        }
    }
}

impl SampleListener for PublishListener {
    fn complete(&self, _ctx: &SampleContext, activity: &Activity, name: &ObjectName, snapshot: &Snapshot) {
        self.publish(activity, name, snapshot);
    }

    fn post_activity(&self, ctx: &SampleContext, activity: &Activity) {
        for aggregate in activity.aggregates() {
            self.publish(activity, &aggregate.name(), aggregate);
        }
        tracing::debug!(
            sampler = %self.sampler,
            activity = activity.id(),
            resources = ctx.resource_count(),
            metrics = ctx.last_metric_count(),
            elapsed_usec = ctx.last_sample_usec(),
            errors = ctx.error_count(),
            "Cycle published"
        );
    }
}
