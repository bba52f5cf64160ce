use super::{AttributeAction, AttributeCondition};
use crate::context::SampleContext;
use crate::sample::AttributeSample;
use streamx_common::{AttrValue, Severity};

/// Logs a matched condition at the configured severity and returns the
/// number of values the sample read.
#[derive(Debug, Clone)]
pub struct LogAction {
    severity: Severity,
}

impl LogAction {
    pub fn new(severity: Severity) -> Self {
        Self { severity }
    }
}

impl Default for LogAction {
    fn default() -> Self {
        Self::new(Severity::Warning)
    }
}

impl AttributeAction for LogAction {
    fn apply(
        &self,
        ctx: &SampleContext,
        condition: &dyn AttributeCondition,
        sample: &AttributeSample,
    ) -> Option<AttrValue> {
        let condition = condition.name();
        let resource = sample.name();
        let samples = ctx.sample_count();
        match self.severity {
            Severity::Info => {
                tracing::info!(condition, resource = %resource, samples, "Condition matched")
            }
            Severity::Warning => {
                tracing::warn!(condition, resource = %resource, samples, "Condition matched")
            }
            Severity::Error | Severity::Critical => {
                tracing::error!(condition, resource = %resource, samples, severity = %self.severity, "Condition matched")
            }
        }
        Some(sample.values().len().into())
    }
}
