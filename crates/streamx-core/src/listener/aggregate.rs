//! Snapshots assembled from other snapshots of the same activity.
//!
//! An aggregator copies chosen properties of resource snapshots, or values
//! derived from properties it already copied, into one extra snapshot per
//! configured aggregation. A typical use is a single `Disks` snapshot that
//! carries the usage of every mounted disk:
//!
//! ```toml
//! [[aggregators]]
//! id = "host"
//!
//! [[aggregators.snapshots]]
//! name = "os.aggregated:Disks"
//!
//! [[aggregators.snapshots.properties]]
//! name = "${name}.UsedPercent"
//! resource = "os:type=Disk,name=?"
//! attribute = "UsedPercent"
//! where = { name = "/|/home" }
//! ```

use super::SampleListener;
use crate::activity::Activity;
use crate::context::SampleContext;
use crate::error::{Result, StreamxError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use streamx_common::{AttrValue, ObjectName, ObjectNamePattern, Snapshot};

/// Category of aggregated snapshots whose name carries none.
pub const DEFAULT_CATEGORY: &str = "streamx.aggregated";

const CATEGORY_DELIMITER: char = ':';
const ID_DELIMITER: char = '@';
/// Key of a default applying to every template variable.
const ANY_VARIABLE: &str = "";

/// One `[[aggregators]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Defaults to `aggregator-<index>`.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub snapshots: Vec<AggregationConfig>,
}

/// One snapshot an aggregator builds on every cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Snapshot name. A `category:name` form sets the category when
    /// `category` is not given.
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Leaves the snapshot out of the activity when nothing resolved.
    #[serde(default)]
    pub ignore_empty: bool,
    #[serde(default)]
    pub properties: Vec<AggregatedPropertyConfig>,
}

/// Where one aggregated property takes its value from.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatedPropertyConfig {
    /// Property key. `${var}` is replaced by each `where` value of `var`.
    pub name: String,
    /// Pattern of the resource snapshot to read from. `var=?` is replaced by
    /// each `where` value of `var`. Without a resource the attribute is
    /// resolved against the aggregated snapshot itself.
    #[serde(default)]
    pub resource: Option<String>,
    /// Property key to copy. When reading the aggregated snapshot itself it
    /// may be a template such as `${used}/${total}`.
    pub attribute: String,
    /// Variable name to `|` separated values.
    #[serde(default, rename = "where")]
    pub where_values: BTreeMap<String, String>,
    #[serde(default)]
    pub transparent: bool,
    /// Fallback for unresolved template variables: one value for all of
    /// them, or a table keyed by variable name.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug)]
struct Aggregation {
    category: String,
    name: String,
    enabled: bool,
    ignore_empty: bool,
    properties: Vec<AggregatedProperty>,
}

impl Aggregation {
    fn build(config: &AggregationConfig) -> std::result::Result<Self, String> {
        if config.name.trim().is_empty() {
            return Err("aggregated snapshot name must be set".into());
        }
        let (category, name) = qualified_name(&config.name, config.category.as_deref());
        let properties = config
            .properties
            .iter()
            .map(AggregatedProperty::build)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("snapshot {name}: {e}"))?;
        Ok(Self {
            category,
            name,
            enabled: config.enabled,
            ignore_empty: config.ignore_empty,
            properties,
        })
    }
}

/// Splits the configured name into the snapshot category and full name.
fn qualified_name(name: &str, category: Option<&str>) -> (String, String) {
    let (category, full_name) = match category.filter(|c| !c.is_empty()) {
        Some(category) => (category.to_string(), format!("{category}{CATEGORY_DELIMITER}{name}")),
        None => match name.split_once(CATEGORY_DELIMITER) {
            Some((category, _)) => (category.to_string(), name.to_string()),
            None => (DEFAULT_CATEGORY.to_string(), name.to_string()),
        },
    };
    let full_name = match full_name.split_once(ID_DELIMITER) {
        Some((head, _)) => head.to_string(),
        None => full_name,
    };
    (category, full_name)
}

/// One resolved `(resource, key)` pair of a property.
#[derive(Debug)]
struct Source {
    resource: Option<ObjectNamePattern>,
    key: String,
}

#[derive(Debug)]
struct AggregatedProperty {
    sources: Vec<Source>,
    attribute: String,
    variables: Vec<String>,
    transient: bool,
    defaults: BTreeMap<String, String>,
}

impl AggregatedProperty {
    fn build(config: &AggregatedPropertyConfig) -> std::result::Result<Self, String> {
        if config.name.trim().is_empty() {
            return Err("property name must be set".into());
        }
        if config.attribute.trim().is_empty() {
            return Err(format!("property {} has no attribute", config.name));
        }

        let mut expanded: Vec<(Option<String>, String)> = Vec::new();
        for (variable, values) in &config.where_values {
            if variable.trim().is_empty() {
                return Err(format!("property {} has an unnamed where variable", config.name));
            }
            let resource_token = format!("{variable}=?");
            let name_token = format!("${{{variable}}}");
            for value in values.split('|') {
                let resource = config
                    .resource
                    .as_ref()
                    .map(|r| r.replace(&resource_token, &format!("{variable}={value}")));
                let pair = (resource, config.name.replace(&name_token, value));
                if !expanded.contains(&pair) {
                    expanded.push(pair);
                }
            }
        }
        if expanded.is_empty() {
            expanded.push((config.resource.clone(), config.name.clone()));
        }

        let sources = expanded
            .into_iter()
            .map(|(resource, key)| {
                let resource = resource
                    .map(|r| ObjectNamePattern::new(&r))
                    .transpose()
                    .map_err(|e| format!("property {key}: {e}"))?;
                Ok(Source { resource, key })
            })
            .collect::<std::result::Result<Vec<_>, String>>()?;

        Ok(Self {
            sources,
            attribute: config.attribute.clone(),
            variables: template_variables(&config.attribute),
            transient: config.transparent,
            defaults: defaults(config.default.as_ref()),
        })
    }

    /// Resolves the attribute against already aggregated values.
    fn resolve_local(&self, lookup: impl Fn(&str) -> Option<AttrValue>) -> Option<AttrValue> {
        if self.variables.is_empty() {
            return lookup(&self.attribute);
        }
        let values: Vec<(&str, Option<AttrValue>)> = self
            .variables
            .iter()
            .map(|v| (v.as_str(), lookup(v)))
            .collect();
        if values.iter().all(|(_, value)| value.is_none()) {
            return None;
        }

        let mut filled = self.attribute.clone();
        for (variable, value) in values {
            let text = match value {
                Some(value) => value.to_string(),
                None => self
                    .defaults
                    .get(variable)
                    .or_else(|| self.defaults.get(ANY_VARIABLE))
                    .cloned()
                    .unwrap_or_default(),
            };
            filled = filled.replace(&format!("${{{variable}}}"), &text);
        }
        Some(AttrValue::Text(filled))
    }
}

/// Names of the `${...}` variables in `template`, in order of appearance.
fn template_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let variable = after[..end].to_string();
        if !variable.is_empty() && !variables.contains(&variable) {
            variables.push(variable);
        }
        rest = &after[end + 1..];
    }
    variables
}

fn defaults(value: Option<&serde_json::Value>) -> BTreeMap<String, String> {
    let text = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match value {
        None | Some(serde_json::Value::Null) => BTreeMap::new(),
        Some(serde_json::Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), text(v))).collect(),
        Some(other) => BTreeMap::from([(ANY_VARIABLE.to_string(), text(other))]),
    }
}

/// First snapshot of `activity` whose resource name matches `pattern`.
fn resource_snapshot<'a>(activity: &'a Activity, pattern: &ObjectNamePattern) -> Option<&'a Snapshot> {
    activity
        .snapshots()
        .iter()
        .find(|s| ObjectName::new(s.name()).is_ok_and(|name| pattern.matches(&name)))
}

fn put(snapshot: &mut Snapshot, key: String, value: AttrValue, transient: bool) {
    if transient {
        snapshot.add_transient(key, value);
    } else {
        snapshot.add(key, value);
    }
}

/// Listener adding the configured aggregated snapshots to every sampled
/// activity.
pub struct SnapshotAggregator {
    id: String,
    aggregations: Vec<Aggregation>,
    added: AtomicU64,
}

impl SnapshotAggregator {
    pub fn new(id: impl Into<String>, config: &AggregatorConfig) -> Result<Self> {
        let id = id.into();
        let aggregations = config
            .snapshots
            .iter()
            .map(Aggregation::build)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StreamxError::Config(format!("aggregator {id}: {e}")))?;
        Ok(Self {
            id,
            aggregations,
            added: AtomicU64::new(0),
        })
    }

    /// Builds every enabled aggregator. Entries without an id are named
    /// after their position.
    pub fn from_configs(configs: &[AggregatorConfig]) -> Result<Vec<Self>> {
        let mut aggregators = Vec::new();
        for (index, config) in configs.iter().enumerate() {
            let id = config.id.clone().unwrap_or_else(|| format!("aggregator-{index}"));
            if !config.enabled {
                tracing::debug!(aggregator = %id, "Skipping disabled aggregator");
                continue;
            }
            aggregators.push(Self::new(id, config)?);
        }
        Ok(aggregators)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Aggregated snapshots added to activities so far.
    pub fn added_count(&self) -> u64 {
        self.added.load(Ordering::Relaxed)
    }

    fn apply(&self, aggregation: &Aggregation, activity: &mut Activity) {
        let mut values: Vec<(String, AttrValue, bool)> = Vec::new();
        {
            let existing = activity
                .snapshots()
                .iter()
                .find(|s| s.category() == aggregation.category && s.name() == aggregation.name);
            for property in &aggregation.properties {
                for source in &property.sources {
                    let value = match &source.resource {
                        Some(pattern) => resource_snapshot(activity, pattern)
                            .and_then(|s| s.get(&property.attribute))
                            .cloned(),
                        None => property.resolve_local(|key| {
                            values
                                .iter()
                                .rev()
                                .find(|(k, _, _)| k == key)
                                .map(|(_, v, _)| v.clone())
                                .or_else(|| existing.and_then(|s| s.get(key)).cloned())
                        }),
                    };
                    if let Some(value) = value {
                        tracing::trace!(
                            aggregator = %self.id,
                            snapshot = %aggregation.name,
                            property = %source.key,
                            %value,
                            "Aggregated property"
                        );
                        values.push((source.key.clone(), value, property.transient));
                    }
                }
            }
        }

        if let Some(snapshot) = activity.snapshot_mut(&aggregation.category, &aggregation.name) {
            for (key, value, transient) in values {
                put(snapshot, key, value, transient);
            }
            return;
        }
        if values.is_empty() && aggregation.ignore_empty {
            tracing::info!(
                aggregator = %self.id,
                snapshot = %aggregation.name,
                "Ignoring empty aggregated snapshot"
            );
            return;
        }
        let mut snapshot = Snapshot::new(&aggregation.category, &aggregation.name);
        for (key, value, transient) in values {
            put(&mut snapshot, key, value, transient);
        }
        tracing::debug!(
            aggregator = %self.id,
            snapshot = %aggregation.name,
            properties = snapshot.len(),
            "Added aggregated snapshot"
        );
        activity.add_aggregate(snapshot);
        self.added.fetch_add(1, Ordering::Relaxed);
    }
}

impl SampleListener for SnapshotAggregator {
    fn aggregate(&self, _ctx: &SampleContext, activity: &mut Activity) {
        for aggregation in &self.aggregations {
            if !aggregation.enabled {
                tracing::debug!(aggregator = %self.id, snapshot = %aggregation.name, "Skipping disabled aggregation");
                continue;
            }
            if aggregation.properties.is_empty() {
                tracing::debug!(aggregator = %self.id, snapshot = %aggregation.name, "Skipping empty aggregation");
                continue;
            }
            self.apply(aggregation, activity);
        }
    }

    fn stats(&self, _ctx: &SampleContext, stats: &mut BTreeMap<String, AttrValue>) {
        stats.insert(format!("aggregator.{}.snapshot.count", self.id), self.added_count().into());
    }
}
