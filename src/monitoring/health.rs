use crate::core::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Component health, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub reported_at: DateTime<Utc>,
}

/// Snapshot of every registered component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub summary: String,
    pub checked_at: DateTime<Utc>,
    pub components: Vec<ComponentHealth>,
}

/// Registry the scheduler, collaborators and runner report their health into.
///
/// The health monitor turns every UNHEALTHY entry into a HIGH error event on
/// each cycle until the component reports again.
pub struct HealthChecker {
    clock: Arc<dyn Clock>,
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    last_check: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl HealthChecker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            components: Arc::new(RwLock::new(BTreeMap::new())),
            last_check: Arc::new(RwLock::new(None)),
        }
    }

    /// Register a component or replace its last report
    pub async fn register_component(&self, name: &str, status: HealthStatus, message: &str) {
        let entry = ComponentHealth {
            name: name.to_string(),
            status,
            message: message.to_string(),
            reported_at: self.clock.now(),
        };
        self.components.write().await.insert(name.to_string(), entry);
    }

    pub async fn check(&self) -> HealthCheckResult {
        let checked_at = self.clock.now();
        let components: Vec<ComponentHealth> =
            self.components.read().await.values().cloned().collect();

        let status = components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        let problems: Vec<String> = components
            .iter()
            .filter(|c| c.status != HealthStatus::Healthy)
            .map(|c| format!("{}: {}", c.name, c.message))
            .collect();
        let summary = if problems.is_empty() {
            format!("{} components healthy", components.len())
        } else {
            problems.join("; ")
        };

        *self.last_check.write().await = Some(checked_at);
        HealthCheckResult {
            status,
            summary,
            checked_at,
            components,
        }
    }

    pub async fn unhealthy(&self) -> Vec<ComponentHealth> {
        self.components
            .read()
            .await
            .values()
            .filter(|c| c.status == HealthStatus::Unhealthy)
            .cloned()
            .collect()
    }

    pub async fn last_check_time(&self) -> Option<DateTime<Utc>> {
        *self.last_check.read().await
    }
}
