use crate::activity::Activity;
use crate::conditions::{AttributeAction, AttributeCondition};
use crate::config::SamplerConfig;
use crate::error::{Result, StreamxError};
use crate::handler::SampleHandler;
use crate::listener::{FlatteningListener, SampleListener, TraceListener};
use crate::registry::ResourceRegistry;
use crate::scheduler::{Scheduler, SchedulerState};
use std::sync::Arc;

/// Entry point for embedding the engine: one sampler per registry and
/// filter set.
///
/// [`set_schedule`](Self::set_schedule) builds the handler and scheduler,
/// [`run`](Self::run) starts the timer and [`cancel`](Self::cancel) stops
/// it for good.
pub struct Sampler {
    name: String,
    registry: Arc<dyn ResourceRegistry>,
    scheduler: Option<Scheduler>,
}

impl Sampler {
    pub fn new(name: impl Into<String>, registry: Arc<dyn ResourceRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
            scheduler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configures what and how often to sample.
    ///
    /// Installs the flattening listener, plus a trace listener when
    /// `config.trace` is set. Fails if the configuration is invalid or the
    /// sampler is already scheduled.
    pub fn set_schedule(&mut self, config: SamplerConfig) -> Result<Arc<SampleHandler>> {
        if self.scheduler.is_some() {
            return Err(StreamxError::Config(format!(
                "sampler {} is already scheduled",
                self.name
            )));
        }
        let trace = config.trace;
        let flattening = FlatteningListener::from_config(&config);
        let handler = Arc::new(SampleHandler::new(&self.name, self.registry.clone(), config)?);
        handler.add_listener(Arc::new(flattening));
        if trace {
            handler.add_listener(Arc::new(TraceListener::new(&self.name)));
        }
        self.scheduler = Some(Scheduler::new(handler.clone()));
        tracing::info!(sampler = %self.name, registry = self.registry.name(), "Sampler scheduled");
        Ok(handler)
    }

    pub fn handler(&self) -> Option<&Arc<SampleHandler>> {
        self.scheduler.as_ref().map(Scheduler::handler)
    }

    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    fn require_handler(&self) -> Result<&Arc<SampleHandler>> {
        self.handler().ok_or_else(|| {
            StreamxError::Config(format!("sampler {} has no schedule", self.name))
        })
    }

    pub fn add_listener(&self, listener: Arc<dyn SampleListener>) -> Result<()> {
        self.require_handler()?.add_listener(listener);
        Ok(())
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SampleListener>) -> Result<bool> {
        Ok(self.require_handler()?.remove_listener(listener))
    }

    pub fn register(
        &self,
        condition: Arc<dyn AttributeCondition>,
        action: Option<Arc<dyn AttributeAction>>,
    ) -> Result<()> {
        self.require_handler()?.register(condition, action);
        Ok(())
    }

    /// Starts the timer.
    pub fn run(&self) -> Result<()> {
        match &self.scheduler {
            Some(scheduler) => scheduler.open(),
            None => Err(StreamxError::Config(format!(
                "sampler {} has no schedule",
                self.name
            ))),
        }
    }

    /// Runs a single cycle immediately.
    pub async fn sample_once(&self) -> Result<Activity> {
        match &self.scheduler {
            Some(scheduler) => scheduler.run().await,
            None => Err(StreamxError::Config(format!(
                "sampler {} has no schedule",
                self.name
            ))),
        }
    }

    /// Stops the timer and releases the handler.
    pub async fn cancel(&self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.close().await;
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.scheduler.as_ref().map(Scheduler::state),
            Some(SchedulerState::Armed | SchedulerState::Running)
        )
    }
}
