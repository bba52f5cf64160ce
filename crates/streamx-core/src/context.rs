use crate::registry::ResourceRegistry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters and shared state visible to listeners, conditions and actions.
///
/// Counters are updated by the sample handler while it holds its cycle lock
/// and may be read from anywhere.
pub struct SampleContext {
    registry: Arc<dyn ResourceRegistry>,
    sample_count: AtomicU64,
    noop_count: AtomicU64,
    error_count: AtomicU64,
    exclude_attr_count: AtomicU64,
    action_count: AtomicU64,
    total_metric_count: AtomicU64,
    last_metric_count: AtomicU64,
    last_sample_usec: AtomicI64,
    resource_count: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl SampleContext {
    pub fn new(registry: Arc<dyn ResourceRegistry>) -> Self {
        Self {
            registry,
            sample_count: AtomicU64::new(0),
            noop_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            exclude_attr_count: AtomicU64::new(0),
            action_count: AtomicU64::new(0),
            total_metric_count: AtomicU64::new(0),
            last_metric_count: AtomicU64::new(0),
            last_sample_usec: AtomicI64::new(0),
            resource_count: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<dyn ResourceRegistry> {
        &self.registry
    }

    /// Completed (non no-op) sampling cycles.
    pub fn sample_count(&self) -> u64 {
        self.sample_count.load(Ordering::Relaxed)
    }

    pub fn noop_count(&self) -> u64 {
        self.noop_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Attributes excluded from samples, summed over every cycle.
    pub fn exclude_attr_count(&self) -> u64 {
        self.exclude_attr_count.load(Ordering::Relaxed)
    }

    pub fn action_count(&self) -> u64 {
        self.action_count.load(Ordering::Relaxed)
    }

    pub fn total_metric_count(&self) -> u64 {
        self.total_metric_count.load(Ordering::Relaxed)
    }

    /// Properties produced by the most recent cycle.
    pub fn last_metric_count(&self) -> u64 {
        self.last_metric_count.load(Ordering::Relaxed)
    }

    /// Duration of the most recent cycle's sampling pass.
    pub fn last_sample_usec(&self) -> i64 {
        self.last_sample_usec.load(Ordering::Relaxed)
    }

    pub fn resource_count(&self) -> usize {
        self.resource_count.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub(crate) fn incr_sample_count(&self) {
        self.sample_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_noop_count(&self) {
        self.noop_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_error_count(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_action_count(&self) {
        self.action_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_exclude_attr_count(&self, count: usize) {
        self.exclude_attr_count
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_metrics(&self, count: usize, elapsed_usec: i64) {
        self.last_metric_count.store(count as u64, Ordering::Relaxed);
        self.total_metric_count
            .fetch_add(count as u64, Ordering::Relaxed);
        self.last_sample_usec.store(elapsed_usec, Ordering::Relaxed);
    }

    pub(crate) fn set_resource_count(&self, count: usize) {
        self.resource_count.store(count, Ordering::Relaxed);
    }

    pub(crate) fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock() = error;
    }

    /// Zeroes every counter and clears the last error.
    pub(crate) fn reset(&self) {
        for counter in [
            &self.sample_count,
            &self.noop_count,
            &self.error_count,
            &self.exclude_attr_count,
            &self.action_count,
            &self.total_metric_count,
            &self.last_metric_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.last_sample_usec.store(0, Ordering::Relaxed);
        self.set_last_error(None);
    }
}

impl std::fmt::Debug for SampleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleContext")
            .field("registry", &self.registry.name())
            .field("sample_count", &self.sample_count())
            .field("noop_count", &self.noop_count())
            .field("error_count", &self.error_count())
            .field("resource_count", &self.resource_count())
            .finish()
    }
}
