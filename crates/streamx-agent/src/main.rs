mod agent;
mod config;
mod publish;

use crate::agent::SamplingAgent;
use anyhow::Result;
use std::time::Duration;
use tokio::signal;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());

    let config = config::AgentConfig::load(&config_path)?;

    let mut filter = EnvFilter::from_default_env().add_directive("streamx=info".parse()?);
    if let Some(directives) = &config.log_filter {
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            filter = filter.add_directive(directive.parse()?);
        }
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    streamx_common::id::set_node(config.node_id);
    tracing::info!(
        agent_id = %config.agent_id,
        node_id = config.node_id,
        config = %config_path,
        "streamx-agent starting"
    );

    let agent = SamplingAgent::new(&config)?;
    agent.start()?;

    let period = Duration::from_secs(config.report_interval_secs);
    let mut report = interval_at(Instant::now() + period, period);
    report.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        samplers = agent.sampler_names().len(),
        report_interval_secs = config.report_interval_secs,
        "Sampling started"
    );

    loop {
        tokio::select! {
            _ = report.tick() => {
                agent.report();
                if !agent.is_running() {
                    tracing::warn!("No sampler is running, stopping");
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    agent.shutdown().await;
    agent.report();
    tracing::info!(agent_id = agent.agent_id(), "streamx-agent stopped");
    Ok(())
}
