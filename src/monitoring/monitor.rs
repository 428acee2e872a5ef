use super::health::HealthChecker;
use super::probe::{ResourceProbe, ResourceSample};
use crate::core::Severity;
use crate::error::ConfigError;
use crate::recovery::{ErrorRecoveryEngine, RecoveryReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Usage percentages that produce HIGH and CRITICAL events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub high: f64,
    pub critical: f64,
}

impl Threshold {
    pub fn severity_for(&self, percent: f64) -> Option<Severity> {
        if percent >= self.critical {
            Some(Severity::Critical)
        } else if percent >= self.high {
            Some(Severity::High)
        } else {
            None
        }
    }
}

/// Background health monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    pub memory: Threshold,
    pub cpu: Threshold,
    pub disk: Threshold,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            memory: Threshold {
                high: 80.0,
                critical: 95.0,
            },
            cpu: Threshold {
                high: 85.0,
                critical: 98.0,
            },
            disk: Threshold {
                high: 85.0,
                critical: 95.0,
            },
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.interval_secs".to_string(),
                value: "0".to_string(),
            });
        }
        for (name, t) in [("memory", self.memory), ("cpu", self.cpu), ("disk", self.disk)] {
            if !(t.high > 0.0 && t.high <= t.critical) {
                return Err(ConfigError::InvalidValue {
                    key: format!("monitor.{}", name),
                    value: format!("high {} critical {}", t.high, t.critical),
                });
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// A threshold breach turned into an error report
#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub component: String,
    pub message: String,
    pub severity: Severity,
}

/// Threshold breaches in a resource sample
pub fn breaches(sample: &ResourceSample, config: &MonitorConfig) -> Vec<Breach> {
    let readings = [
        ("memory usage", sample.memory_percent, config.memory),
        ("cpu load", sample.cpu_percent, config.cpu),
        ("disk usage", sample.disk_percent, config.disk),
    ];

    readings
        .iter()
        .filter_map(|(label, value, threshold)| {
            let value = (*value)?;
            let severity = threshold.severity_for(value)?;
            let limit = if severity == Severity::Critical {
                threshold.critical
            } else {
                threshold.high
            };
            Some(Breach {
                component: "system".to_string(),
                message: format!("{} {:.1}% exceeds {:.1}%", label, value, limit),
                severity,
            })
        })
        .collect()
}

/// Polls resource usage and component health on a fixed interval and feeds
/// breaches into the recovery engine
pub struct HealthMonitor {
    config: MonitorConfig,
    probe: Arc<dyn ResourceProbe>,
    checker: Arc<HealthChecker>,
    engine: Arc<ErrorRecoveryEngine>,
    running: Arc<RwLock<bool>>,
}

impl HealthMonitor {
    pub fn new(
        config: MonitorConfig,
        probe: Arc<dyn ResourceProbe>,
        checker: Arc<HealthChecker>,
        engine: Arc<ErrorRecoveryEngine>,
    ) -> Self {
        Self {
            config,
            probe,
            checker,
            engine,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// One polling pass
    pub async fn check_once(&self) -> Vec<RecoveryReport> {
        let sample = self.probe.sample().await;
        debug!("Resource sample: {:?}", sample);

        let mut found = breaches(&sample, &self.config);
        for component in self.checker.unhealthy().await {
            found.push(Breach {
                message: format!("component unhealthy: {}", component.message),
                component: component.name,
                severity: Severity::High,
            });
        }

        let mut reports = Vec::with_capacity(found.len());
        for breach in found {
            warn!(
                "Health breach in {} [{}]: {}",
                breach.component, breach.severity, breach.message
            );
            reports.push(
                self.engine
                    .report(&breach.component, &breach.message, breach.severity)
                    .await,
            );
        }
        reports
    }

    /// Spawn the polling loop
    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        *self.running.write().await = true;
        info!("Starting health monitor every {:?}", self.config.interval());

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval());
            loop {
                ticker.tick().await;
                if !self.is_running().await {
                    break;
                }
                self.check_once().await;
            }
            info!("Health monitor stopped");
        })
    }

    /// Stop after the current pass
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
