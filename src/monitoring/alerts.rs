use crate::core::Severity;
use crate::error::NotifyError;
use crate::traits::Notifier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_CAPACITY: usize = 1000;

/// A notification kept by the alert manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub component: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub context: Value,
}

/// Notifier of last resort: writes every notification to the log and keeps
/// the newest `capacity` of them for status queries.
pub struct AlertManager {
    history: Arc<RwLock<VecDeque<Alert>>>,
    capacity: usize,
}

impl AlertManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
        }
    }

    pub async fn raise(&self, alert: Alert) {
        match alert.severity {
            Severity::Low => log::info!("[{}] {}", alert.component, alert.message),
            Severity::Medium => log::warn!("[{}] {}", alert.component, alert.message),
            Severity::High | Severity::Critical => log::error!(
                "[{}] [{}] {}",
                alert.severity,
                alert.component,
                alert.message
            ),
        }

        let mut history = self.history.write().await;
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(alert);
    }

    /// Newest first
    pub async fn recent(&self, count: usize) -> Vec<Alert> {
        self.history.read().await.iter().rev().take(count).cloned().collect()
    }

    /// Alerts at `floor` or worse raised at or after `since`, oldest first
    pub async fn at_least(&self, floor: Severity, since: DateTime<Utc>) -> Vec<Alert> {
        self.history
            .read()
            .await
            .iter()
            .filter(|a| a.severity >= floor && a.raised_at >= since)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.history.read().await.is_empty()
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Recovery escalations nest the component under `event`; everything else
/// may carry it at the top level.
fn component_of(context: &Value) -> &str {
    context
        .get("event")
        .and_then(|e| e.get("component"))
        .or_else(|| context.get("component"))
        .and_then(Value::as_str)
        .unwrap_or("autopilot")
}

#[async_trait]
impl Notifier for AlertManager {
    async fn notify(
        &self,
        severity: Severity,
        message: &str,
        context: &Value,
    ) -> Result<(), NotifyError> {
        self.raise(Alert {
            severity,
            component: component_of(context).to_string(),
            message: message.to_string(),
            raised_at: Utc::now(),
            context: context.clone(),
        })
        .await;
        Ok(())
    }
}
