use crate::error::{Result, StreamxError};
use serde::Deserialize;
use std::time::Duration;
use streamx_common::ObjectNamePattern;

/// Settings for one sampler: which resources to sample, how often, and how
/// nested values are turned into property keys.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SamplerConfig {
    /// Semicolon separated include patterns.
    #[serde(default = "default_include_filter")]
    pub include_filter: String,
    /// Semicolon separated exclude patterns, applied after the include list.
    #[serde(default)]
    pub exclude_filter: String,
    #[serde(default)]
    pub initial_delay_ms: u64,
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Maximum attributes fetched per registry call; 0 fetches all at once.
    #[serde(default)]
    pub batch_size: usize,
    #[serde(default = "default_true")]
    pub exclude_on_error: bool,
    #[serde(default = "default_path_delimiter")]
    pub path_delimiter: String,
    #[serde(default = "default_delimiter_replacement")]
    pub delimiter_replacement: String,
    #[serde(default = "default_unique_suffix")]
    pub unique_suffix: String,
    /// Adds a transient `objectName` property to every snapshot.
    #[serde(default)]
    pub force_object_name: bool,
    /// Logs every listener callback at debug level.
    #[serde(default)]
    pub trace: bool,
}

fn default_include_filter() -> String {
    "*:*".to_string()
}

fn default_period_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_path_delimiter() -> String {
    "\\".to_string()
}

fn default_delimiter_replacement() -> String {
    "!".to_string()
}

fn default_unique_suffix() -> String {
    "_".to_string()
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            include_filter: default_include_filter(),
            exclude_filter: String::new(),
            initial_delay_ms: 0,
            period_ms: default_period_ms(),
            batch_size: 0,
            exclude_on_error: true,
            path_delimiter: default_path_delimiter(),
            delimiter_replacement: default_delimiter_replacement(),
            unique_suffix: default_unique_suffix(),
            force_object_name: false,
            trace: false,
        }
    }
}

impl SamplerConfig {
    pub fn new(include_filter: impl Into<String>, period: Duration) -> Self {
        Self {
            include_filter: include_filter.into(),
            period_ms: period.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn include_patterns(&self) -> Result<Vec<ObjectNamePattern>> {
        Ok(ObjectNamePattern::parse_list(&self.include_filter)?)
    }

    pub fn exclude_patterns(&self) -> Result<Vec<ObjectNamePattern>> {
        Ok(ObjectNamePattern::parse_list(&self.exclude_filter)?)
    }

    /// Rejects settings the engine cannot run with.
    ///
    /// ```
    /// use streamx_core::config::SamplerConfig;
    ///
    /// assert!(SamplerConfig::default().validate().is_ok());
    ///
    /// let zero = SamplerConfig { period_ms: 0, ..SamplerConfig::default() };
    /// assert!(zero.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.period_ms == 0 {
            return Err(StreamxError::Config("period_ms must be positive".into()));
        }
        if self.include_patterns()?.is_empty() {
            return Err(StreamxError::Config(
                "include_filter must name at least one pattern".into(),
            ));
        }
        self.exclude_patterns()?;
        if self.path_delimiter.is_empty() {
            return Err(StreamxError::Config("path_delimiter must not be empty".into()));
        }
        if self.path_delimiter == self.delimiter_replacement {
            return Err(StreamxError::Config(format!(
                "delimiter_replacement must differ from path_delimiter '{}'",
                self.path_delimiter
            )));
        }
        Ok(())
    }
}
