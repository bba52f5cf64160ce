//! Hooks into the sampling cycle.
//!
//! Each cycle calls, in order: [`SampleListener::pre_activity`], then per
//! resource [`pre_sample`](SampleListener::pre_sample),
//! [`post_sample`](SampleListener::post_sample), optionally
//! [`sample_error`](SampleListener::sample_error) and
//! [`complete`](SampleListener::complete), then
//! [`aggregate`](SampleListener::aggregate),
//! [`post_activity`](SampleListener::post_activity) and finally
//! [`stats`](SampleListener::stats). Listeners run in registration order.

pub mod aggregate;
mod flattening;
mod trace;

pub use aggregate::{AggregatorConfig, SnapshotAggregator};
pub use flattening::FlatteningListener;
pub use trace::TraceListener;

use crate::activity::Activity;
use crate::context::SampleContext;
use crate::error::{SampleError, StreamxError};
use crate::sample::AttributeSample;
use std::collections::BTreeMap;
use streamx_common::{AttrValue, ObjectName, Severity, Snapshot};

/// Observer of the sampling cycle. Every hook defaults to a no-op.
#[allow(unused_variables)]
pub trait SampleListener: Send + Sync {
    /// A resource passed the filters and joined the resource map.
    fn register(&self, ctx: &SampleContext, name: &ObjectName) {}

    /// A resource left the resource map.
    fn unregister(&self, ctx: &SampleContext, name: &ObjectName) {}

    /// Start of a cycle. May mark the activity as a no-op.
    fn pre_activity(&self, ctx: &SampleContext, activity: &mut Activity) {}

    /// Before the registry is read. Cycle-local exclusions go here.
    fn pre_sample(&self, ctx: &SampleContext, sample: &mut AttributeSample) {}

    /// After the registry is read. Flattening listeners fill the sample's
    /// snapshot here.
    fn post_sample(&self, ctx: &SampleContext, sample: &mut AttributeSample) -> Result<(), SampleError> {
        Ok(())
    }

    /// A resource produced a non-empty snapshot.
    fn complete(&self, ctx: &SampleContext, activity: &Activity, name: &ObjectName, snapshot: &Snapshot) {}

    /// Sampling or flattening of one resource failed.
    fn sample_error(&self, ctx: &SampleContext, sample: &AttributeSample, severity: Severity) {}

    /// A failure outside any single sample (discovery, connection loss).
    fn error(&self, ctx: &SampleContext, error: &StreamxError) {}

    /// Every resource was sampled. Listeners may derive further snapshots
    /// from the activity here, before anyone sees the finished cycle.
    fn aggregate(&self, ctx: &SampleContext, activity: &mut Activity) {}

    /// End of a cycle.
    fn post_activity(&self, ctx: &SampleContext, activity: &Activity) {}

    /// Adds listener-specific entries to the cycle's statistics snapshot.
    fn stats(&self, ctx: &SampleContext, stats: &mut BTreeMap<String, AttrValue>) {}
}
