use super::SampleListener;
use crate::activity::Activity;
use crate::context::SampleContext;
use crate::error::{SampleError, StreamxError};
use crate::sample::AttributeSample;
use streamx_common::{ObjectName, Severity, Snapshot};

/// Logs every cycle callback at debug level.
pub struct TraceListener {
    sampler: String,
}

impl TraceListener {
    pub fn new(sampler: impl Into<String>) -> Self {
        Self {
            sampler: sampler.into(),
        }
    }
}

impl SampleListener for TraceListener {
    fn register(&self, _ctx: &SampleContext, name: &ObjectName) {
        tracing::debug!(sampler = %self.sampler, resource = %name, "register");
    }

    fn unregister(&self, _ctx: &SampleContext, name: &ObjectName) {
        tracing::debug!(sampler = %self.sampler, resource = %name, "unregister");
    }

    fn pre_activity(&self, ctx: &SampleContext, activity: &mut Activity) {
        tracing::debug!(
            sampler = %self.sampler,
            activity_id = activity.id(),
            resources = ctx.resource_count(),
            "pre_activity"
        );
    }

    fn pre_sample(&self, _ctx: &SampleContext, sample: &mut AttributeSample) {
        tracing::debug!(
            sampler = %self.sampler,
            resource = %sample.name(),
            attributes = sample.descriptors().len(),
            "pre_sample"
        );
    }

    fn post_sample(&self, _ctx: &SampleContext, sample: &mut AttributeSample) -> Result<(), SampleError> {
        tracing::debug!(
            sampler = %self.sampler,
            resource = %sample.name(),
            values = sample.values().len(),
            excluded = sample.excludes().len(),
            "post_sample"
        );
        Ok(())
    }

    fn complete(&self, _ctx: &SampleContext, activity: &Activity, name: &ObjectName, snapshot: &Snapshot) {
        tracing::debug!(
            sampler = %self.sampler,
            activity_id = activity.id(),
            resource = %name,
            properties = snapshot.len(),
            "complete"
        );
    }

    fn sample_error(&self, _ctx: &SampleContext, sample: &AttributeSample, severity: Severity) {
        tracing::debug!(
            sampler = %self.sampler,
            resource = %sample.name(),
            %severity,
            error = ?sample.error(),
            "sample_error"
        );
    }

    fn error(&self, _ctx: &SampleContext, error: &StreamxError) {
        tracing::debug!(sampler = %self.sampler, error = %error, "error");
    }

    fn aggregate(&self, _ctx: &SampleContext, activity: &mut Activity) {
        tracing::debug!(
            sampler = %self.sampler,
            activity_id = activity.id(),
            snapshots = activity.snapshots().len(),
            "aggregate"
        );
    }

    fn post_activity(&self, ctx: &SampleContext, activity: &Activity) {
        tracing::debug!(
            sampler = %self.sampler,
            activity_id = activity.id(),
            snapshots = activity.snapshots().len(),
            metrics = ctx.last_metric_count(),
            "post_activity"
        );
    }
}
