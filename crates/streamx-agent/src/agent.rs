use crate::config::{AgentConfig, ConnectionKind, SamplerEntry};
use crate::publish::PublishListener;
use std::sync::Arc;
use streamx_core::conditions::log::LogAction;
use streamx_core::listener::{AggregatorConfig, SnapshotAggregator};
use streamx_core::registry::ResourceRegistry;
use streamx_core::Sampler;
use streamx_platform::PlatformRegistry;

impl ConnectionKind {
    pub fn connect(self, name: &str) -> Arc<dyn ResourceRegistry> {
        match self {
            ConnectionKind::Platform => Arc::new(PlatformRegistry::new(name)),
        }
    }
}

struct Running {
    sampler: Sampler,
    publish: Arc<PublishListener>,
}

/// Owns one scheduled [`Sampler`] per configured connection.
pub struct SamplingAgent {
    agent_id: String,
    samplers: Vec<Running>,
}

impl SamplingAgent {
    /// Connects and schedules every configured sampler without starting
    /// the timers.
    pub fn new(config: &AgentConfig) -> anyhow::Result<Self> {
        let mut samplers = Vec::with_capacity(config.samplers.len());
        for entry in &config.samplers {
            let registry = entry.connection.connect(&entry.name);
            samplers.push(Self::schedule(&config.agent_id, entry, &config.aggregators, registry)?);
        }
        Ok(Self {
            agent_id: config.agent_id.clone(),
            samplers,
        })
    }

    fn schedule(
        agent_id: &str,
        entry: &SamplerEntry,
        aggregators: &[AggregatorConfig],
        registry: Arc<dyn ResourceRegistry>,
    ) -> anyhow::Result<Running> {
        let mut sampler = Sampler::new(&entry.name, registry);
        sampler.set_schedule(entry.sampler.clone())?;

        for aggregator in SnapshotAggregator::from_configs(aggregators)? {
            sampler.add_listener(Arc::new(aggregator))?;
        }
        let publish = Arc::new(PublishListener::new(agent_id, &entry.name));
        sampler.add_listener(publish.clone())?;
        for condition in &entry.conditions {
            sampler.register(
                Arc::new(condition.build()?),
                Some(Arc::new(LogAction::new(condition.severity))),
            )?;
        }
        Ok(Running { sampler, publish })
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn sampler_names(&self) -> Vec<&str> {
        self.samplers.iter().map(|r| r.sampler.name()).collect()
    }

    /// Starts every sampler's timer.
    pub fn start(&self) -> anyhow::Result<()> {
        for running in &self.samplers {
            running.sampler.run()?;
            tracing::info!(
                sampler = running.sampler.name(),
                period_ms = running.sampler.handler().map(|h| h.config().period_ms),
                "Sampler started"
            );
        }
        Ok(())
    }

    /// Logs the counters of every sampler.
    pub fn report(&self) {
        for running in &self.samplers {
            let Some(handler) = running.sampler.handler() else {
                continue;
            };
            let ctx = handler.context();
            let last_error = ctx.last_error().unwrap_or_default();
            tracing::info!(
                sampler = running.sampler.name(),
                running = running.sampler.is_running(),
                resources = ctx.resource_count(),
                samples = ctx.sample_count(),
                errors = ctx.error_count(),
                excluded = ctx.exclude_attr_count(),
                metrics = ctx.total_metric_count(),
                published = running.publish.published(),
                properties = running.publish.properties(),
                last_error = %last_error,
                "Sampler report"
            );
        }
    }

    /// Cancels every sampler and waits for in-flight cycles to finish.
    pub async fn shutdown(&self) {
        for running in &self.samplers {
            running.sampler.cancel().await;
            tracing::info!(sampler = running.sampler.name(), "Sampler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.samplers.iter().any(|r| r.sampler.is_running())
    }
}
