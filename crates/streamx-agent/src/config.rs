use serde::Deserialize;
use std::collections::HashSet;
use streamx_common::{AttrValue, ObjectNamePattern, Severity};
use streamx_core::conditions::simple::{CompareOp, SimpleCondition};
use streamx_core::listener::{AggregatorConfig, SnapshotAggregator};
use streamx_core::SamplerConfig;

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    pub agent_id: String,
    /// Node number stamped into activity tracking ids (0-31).
    #[serde(default = "default_node_id")]
    pub node_id: u8,
    /// Extra `EnvFilter` directives, e.g. `streamx_core=debug`.
    pub log_filter: Option<String>,
    /// How often the agent logs a summary of every sampler.
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    #[serde(default)]
    pub samplers: Vec<SamplerEntry>,
    /// Aggregated snapshots added to every sampler's cycles.
    #[serde(default)]
    pub aggregators: Vec<AggregatorConfig>,
}

/// One `[[samplers]]` table: a connection plus the sampler settings.
#[derive(Debug, Deserialize)]
pub struct SamplerEntry {
    pub name: String,
    #[serde(default)]
    pub connection: ConnectionKind,
    #[serde(default)]
    pub conditions: Vec<ConditionEntry>,
    #[serde(flatten)]
    pub sampler: SamplerConfig,
}

/// Where a sampler reads its resources from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// The local host, through the platform registry.
    #[default]
    Platform,
}

/// A threshold check logged when it matches.
#[derive(Debug, Deserialize)]
pub struct ConditionEntry {
    pub name: String,
    pub resource: String,
    pub attribute: String,
    pub operator: String,
    pub value: serde_json::Value,
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

fn default_node_id() -> u8 {
    streamx_common::id::DEFAULT_NODE
}

fn default_report_interval() -> u64 {
    60
}

fn default_severity() -> Severity {
    Severity::Warning
}

impl ConditionEntry {
    pub fn build(&self) -> anyhow::Result<SimpleCondition> {
        let resource = ObjectNamePattern::new(&self.resource)?;
        let operator: CompareOp = self.operator.parse().map_err(anyhow::Error::msg)?;
        Ok(SimpleCondition::new(
            &self.name,
            resource,
            &self.attribute,
            operator,
            AttrValue::from(self.value.clone()),
        ))
    }
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configs the agent could not start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.samplers.is_empty() {
            anyhow::bail!("no [[samplers]] configured");
        }
        if self.node_id > streamx_common::id::MAX_NODE {
            anyhow::bail!("node_id must be at most {}", streamx_common::id::MAX_NODE);
        }
        if self.report_interval_secs == 0 {
            anyhow::bail!("report_interval_secs must be positive");
        }
        SnapshotAggregator::from_configs(&self.aggregators)?;
        let mut names = HashSet::new();
        for entry in &self.samplers {
            if !names.insert(entry.name.as_str()) {
                anyhow::bail!("duplicate sampler name: {}", entry.name);
            }
            entry
                .sampler
                .validate()
                .map_err(|e| anyhow::anyhow!("sampler {}: {e}", entry.name))?;
            for condition in &entry.conditions {
                condition
                    .build()
                    .map_err(|e| anyhow::anyhow!("sampler {} condition {}: {e}", entry.name, condition.name))?;
            }
        }
        Ok(())
    }
}
