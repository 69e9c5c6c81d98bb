//! Resolved plugin configuration.
//!
//! [`vgpu_core::SchedulerConfig`] mirrors the TOML file with every field
//! optional. [`PluginConfig`] is what the plugin actually runs with: all
//! defaults filled in and durations parsed.

use std::path::Path;
use std::time::Duration;

use vgpu_core::{HUNDRED_CORE, MAX_DEVICE_NUMBER, SchedulerConfig, parse_duration};

use crate::commit::DEFAULT_MIN_COMMIT_INTERVAL;
use crate::error::{SchedulerError, SchedulerResult};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    /// Per-container ceiling on requested devices.
    pub max_device_number: i64,
    /// Per-container ceiling on requested core units.
    pub max_core_units: i64,
    pub min_commit_interval: Duration,
    pub retry: RetryPolicy,
    /// Apply the link-topology score adjustment.
    pub gpu_topology: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            max_device_number: MAX_DEVICE_NUMBER,
            max_core_units: HUNDRED_CORE,
            min_commit_interval: DEFAULT_MIN_COMMIT_INTERVAL,
            retry: RetryPolicy::default(),
            gpu_topology: true,
        }
    }
}

impl PluginConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = SchedulerConfig::from_file(path)?;
        Ok(Self::resolve(&raw)?)
    }

    /// Fill defaults and validate.
    pub fn resolve(raw: &SchedulerConfig) -> SchedulerResult<Self> {
        let mut config = Self::default();

        if let Some(limits) = &raw.limits {
            if let Some(n) = limits.max_device_number {
                config.max_device_number = positive("limits.max_device_number", n)?;
            }
            if let Some(n) = limits.max_core_units {
                config.max_core_units = positive("limits.max_core_units", n)?;
            }
        }

        if let Some(interval) = raw.bind.as_ref().and_then(|b| b.min_commit_interval.as_deref()) {
            config.min_commit_interval = duration("bind.min_commit_interval", interval)?;
        }

        if let Some(retry) = &raw.retry {
            if let Some(steps) = retry.steps {
                config.retry.steps = steps;
            }
            if let Some(d) = retry.initial_backoff.as_deref() {
                config.retry.initial_backoff = duration("retry.initial_backoff", d)?;
            }
            if let Some(factor) = retry.factor {
                if factor < 1.0 {
                    return Err(SchedulerError::Config(format!(
                        "retry.factor must be at least 1.0, got {factor}"
                    )));
                }
                config.retry.factor = factor;
            }
            if let Some(jitter) = retry.jitter {
                if jitter < 0.0 {
                    return Err(SchedulerError::Config(format!(
                        "retry.jitter must not be negative, got {jitter}"
                    )));
                }
                config.retry.jitter = jitter;
            }
            if let Some(d) = retry.max_backoff.as_deref() {
                config.retry.max_backoff = duration("retry.max_backoff", d)?;
            }
        }

        if let Some(topology) = raw.features.as_ref().and_then(|f| f.gpu_topology) {
            config.gpu_topology = topology;
        }

        Ok(config)
    }
}

fn positive(field: &str, value: i64) -> SchedulerResult<i64> {
    if value > 0 {
        Ok(value)
    } else {
        Err(SchedulerError::Config(format!("{field} must be positive, got {value}")))
    }
}

fn duration(field: &str, value: &str) -> SchedulerResult<Duration> {
    parse_duration(value)
        .ok_or_else(|| SchedulerError::Config(format!("{field}: invalid duration {value:?}")))
}
