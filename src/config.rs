//! Autopilot configuration: one JSON document plus environment overrides.

use crate::error::ConfigError;
use crate::learning::LearningConfig;
use crate::monitoring::MonitorConfig;
use crate::recovery::RecoveryConfig;
use crate::retrain::RetrainConfig;
use crate::scheduler::SchedulerConfig;
use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_STATE_DIR: &str = "AUTOPILOT_STATE_DIR";
pub const ENV_UTC_OFFSET: &str = "AUTOPILOT_UTC_OFFSET";
pub const ENV_MONITOR_INTERVAL: &str = "AUTOPILOT_MONITOR_INTERVAL_SECS";

/// Complete autopilot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    pub scheduler: SchedulerConfig,
    pub learning: LearningConfig,
    pub retrain: RetrainConfig,
    pub recovery: RecoveryConfig,
    pub monitor: MonitorConfig,
    /// Directory holding the file-backed state store
    pub state_dir: PathBuf,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            learning: LearningConfig::default(),
            retrain: RetrainConfig::default(),
            recovery: RecoveryConfig::default(),
            monitor: MonitorConfig::default(),
            state_dir: PathBuf::from("state"),
        }
    }
}

impl AutopilotConfig {
    /// Load from a JSON file. Missing sections take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply `AUTOPILOT_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_STATE_DIR).filter(|v| !v.trim().is_empty()) {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(offset) = lookup(ENV_UTC_OFFSET) {
            self.scheduler.utc_offset = offset;
        }
        if let Some(interval) = lookup(ENV_MONITOR_INTERVAL) {
            self.monitor.interval_secs =
                interval
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_MONITOR_INTERVAL.to_string(),
                        value: interval.clone(),
                    })?;
        }
        Ok(())
    }

    /// Reject anything that would leave behavior undefined
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.learning.validate()?;
        self.retrain.validate()?;
        self.recovery.validate()?;
        self.monitor.validate()?;
        Ok(())
    }
}
