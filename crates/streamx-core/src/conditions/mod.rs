//! Conditions evaluated against every sample, each paired with an action.
//!
//! After a resource is sampled, every registered [`AttributeCondition`] is
//! asked whether it holds for the sample. When it does, its
//! [`AttributeAction`] runs and the context's action counter goes up.
//! Built-in conditions live in [`simple`]; [`LogAction`] and [`NoopAction`]
//! are the built-in actions.

pub mod log;
pub mod simple;

pub use log::LogAction;
pub use simple::{CompareOp, SimpleCondition};

use crate::context::SampleContext;
use crate::sample::AttributeSample;
use std::sync::{Arc, OnceLock};
use streamx_common::AttrValue;

/// A predicate over one sample.
pub trait AttributeCondition: Send + Sync {
    /// Unique name; registering another condition under it replaces this one.
    fn name(&self) -> &str;

    fn evaluate(&self, ctx: &SampleContext, sample: &AttributeSample) -> bool;
}

/// Runs when its condition holds. The returned value is informational.
pub trait AttributeAction: Send + Sync {
    fn apply(
        &self,
        ctx: &SampleContext,
        condition: &dyn AttributeCondition,
        sample: &AttributeSample,
    ) -> Option<AttrValue>;
}

/// Action that does nothing. Used when a condition is registered without one.
#[derive(Debug, Default)]
pub struct NoopAction;

impl NoopAction {
    /// Process-wide shared instance.
    pub fn shared() -> Arc<dyn AttributeAction> {
        static NOOP: OnceLock<Arc<NoopAction>> = OnceLock::new();
        NOOP.get_or_init(|| Arc::new(NoopAction)).clone()
    }
}

impl AttributeAction for NoopAction {
    fn apply(&self, _: &SampleContext, _: &dyn AttributeCondition, _: &AttributeSample) -> Option<AttrValue> {
        None
    }
}

/// Condition backed by a closure.
pub struct FnCondition<F> {
    name: String,
    predicate: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&AttributeSample) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> AttributeCondition for FnCondition<F>
where
    F: Fn(&AttributeSample) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, _ctx: &SampleContext, sample: &AttributeSample) -> bool {
        (self.predicate)(sample)
    }
}

type Entry = (Arc<dyn AttributeCondition>, Arc<dyn AttributeAction>);

/// Ordered set of condition/action pairs, keyed by condition name.
#[derive(Default)]
pub struct ConditionRegistry {
    entries: Vec<Entry>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition. A condition with the same name is replaced in place.
    /// Without an action the shared [`NoopAction`] is used.
    pub fn register(
        &mut self,
        condition: Arc<dyn AttributeCondition>,
        action: Option<Arc<dyn AttributeAction>>,
    ) {
        let action = action.unwrap_or_else(NoopAction::shared);
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.name() == condition.name())
        {
            Some(entry) => *entry = (condition, action),
            None => self.entries.push((condition, action)),
        }
    }

    /// Removes a condition by name. Returns true if found and removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let len_before = self.entries.len();
        self.entries.retain(|(c, _)| c.name() != name);
        self.entries.len() < len_before
    }

    pub fn get(&self, name: &str) -> Option<&dyn AttributeCondition> {
        self.entries
            .iter()
            .find(|(c, _)| c.name() == name)
            .map(|(c, _)| c.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(c, _)| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copies the entries so they can be evaluated without holding a lock.
    pub(crate) fn entries(&self) -> Vec<Entry> {
        self.entries.clone()
    }
}

/// Evaluates `entries` against `sample` in order and returns how many
/// actions ran.
pub(crate) fn evaluate_all(entries: &[Entry], ctx: &SampleContext, sample: &AttributeSample) -> usize {
    let mut fired = 0;
    for (condition, action) in entries {
        if condition.evaluate(ctx, sample) {
            let result = action.apply(ctx, condition.as_ref(), sample);
            ctx.incr_action_count();
            fired += 1;
            tracing::debug!(
                condition = condition.name(),
                resource = %sample.name(),
                result = ?result,
                "Condition matched"
            );
        }
    }
    fired
}
