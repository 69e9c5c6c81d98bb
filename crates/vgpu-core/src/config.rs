//! Scheduler configuration file parser.
//!
//! Every section and field is optional; consumers resolve missing values
//! to their own defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub limits: Option<LimitsConfig>,
    pub bind: Option<BindConfig>,
    pub retry: Option<RetryConfig>,
    pub features: Option<FeaturesConfig>,
}

/// Static per-container request limits checked at admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_device_number: Option<i64>,
    pub max_core_units: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindConfig {
    /// Minimum time between two placement commits (e.g., "30ms").
    pub min_commit_interval: Option<String>,
}

/// Retry policy for the metadata patch issued during bind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub steps: Option<u32>,
    pub initial_backoff: Option<String>,
    pub factor: Option<f64>,
    pub jitter: Option<f64>,
    pub max_backoff: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub gpu_topology: Option<bool>,
}

impl SchedulerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Parse a duration string like "30ms", "5s", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_millis)
    }
}
