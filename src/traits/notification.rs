use crate::core::Severity;
use crate::error::NotifyError;
use async_trait::async_trait;
use log::warn;
use serde_json::Value;

/// Operator notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        severity: Severity,
        message: &str,
        context: &Value,
    ) -> Result<(), NotifyError>;
}

/// Fire-and-forget notification. Failures are logged and dropped.
pub async fn notify_quietly(
    notifier: &dyn Notifier,
    severity: Severity,
    message: &str,
    context: &Value,
) {
    if let Err(e) = notifier.notify(severity, message, context).await {
        warn!("Failed to deliver {} notification '{}': {}", severity, message, e);
    }
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        severity: Severity,
        message: &str,
        context: &Value,
    ) -> Result<(), NotifyError> {
        match severity {
            Severity::Low | Severity::Medium => log::info!("[{}] {} {}", severity, message, context),
            Severity::High | Severity::Critical => {
                log::error!("[{}] {} {}", severity, message, context)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _: Severity, _: &str, _: &Value) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_notify_quietly_swallows_failures() {
        notify_quietly(&FailingNotifier, Severity::Critical, "disk full", &Value::Null).await;
        notify_quietly(&LogNotifier, Severity::Low, "ok", &Value::Null).await;
    }
}
