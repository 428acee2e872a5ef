use crate::core::{ErrorEvent, Severity};
use crate::error::{CollaboratorError, NotifyError};
use crate::performance::PerformanceRecord;
use crate::recovery::ActionHandler;
use crate::traits::{
    CollaboratorReport, Notifier, TradingCollaborator, TrainingCollaborator, TrainingOutcome,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One scripted collaborator response
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    Succeed,
    Fail(CollaboratorError),
    /// Sleep, then succeed
    Delay(Duration),
}

/// Trading collaborator replaying scripted responses per operation.
/// Operations without a script succeed.
#[derive(Debug, Default, Clone)]
pub struct ScriptedTradingCollaborator {
    scripts: Arc<Mutex<HashMap<String, VecDeque<ScriptedStep>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTradingCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses for `screening`, `selection`, `start_trading` or
    /// `stop_trading`
    pub async fn script(&self, operation: &str, steps: Vec<ScriptedStep>) {
        self.scripts
            .lock()
            .await
            .entry(operation.to_string())
            .or_default()
            .extend(steps);
    }

    /// Operations called so far, in order
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    async fn play(&self, operation: &str) -> Result<CollaboratorReport, CollaboratorError> {
        self.calls.lock().await.push(operation.to_string());
        let step = self
            .scripts
            .lock()
            .await
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or(ScriptedStep::Succeed);

        match step {
            ScriptedStep::Succeed => Ok(CollaboratorReport::with_message(operation)),
            ScriptedStep::Fail(e) => Err(e),
            ScriptedStep::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(CollaboratorReport::with_message(operation))
            }
        }
    }
}

#[async_trait]
impl TradingCollaborator for ScriptedTradingCollaborator {
    async fn run_screening(&self) -> Result<CollaboratorReport, CollaboratorError> {
        self.play("screening").await
    }

    async fn run_selection(&self) -> Result<CollaboratorReport, CollaboratorError> {
        self.play("selection").await
    }

    async fn start_trading(&self) -> Result<CollaboratorReport, CollaboratorError> {
        self.play("start_trading").await
    }

    async fn stop_trading(&self) -> Result<CollaboratorReport, CollaboratorError> {
        self.play("stop_trading").await
    }
}

/// Trainer that counts calls and can fail a number of times first
#[derive(Debug, Default, Clone)]
pub struct ScriptedTrainer {
    runs: Arc<Mutex<u32>>,
    failures_left: Arc<Mutex<u32>>,
}

impl ScriptedTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(failures: u32) -> Self {
        Self {
            runs: Arc::new(Mutex::new(0)),
            failures_left: Arc::new(Mutex::new(failures)),
        }
    }

    pub async fn runs(&self) -> u32 {
        *self.runs.lock().await
    }
}

#[async_trait]
impl TrainingCollaborator for ScriptedTrainer {
    async fn train(
        &self,
        _history: &[PerformanceRecord],
    ) -> Result<TrainingOutcome, CollaboratorError> {
        let mut runs = self.runs.lock().await;
        *runs += 1;

        let mut failures_left = self.failures_left.lock().await;
        if *failures_left > 0 {
            *failures_left -= 1;
            return Err(CollaboratorError::new("training cluster unavailable"));
        }

        Ok(TrainingOutcome {
            model_version: format!("model-v{}", *runs),
            metrics: Default::default(),
        })
    }
}

/// A delivered notification
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub severity: Severity,
    pub message: String,
    pub context: Value,
}

/// Notifier that keeps everything it was sent
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }

    pub async fn count_at(&self, severity: Severity) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        severity: Severity,
        message: &str,
        context: &Value,
    ) -> Result<(), NotifyError> {
        self.sent.lock().await.push(SentNotification {
            severity,
            message: message.to_string(),
            context: context.clone(),
        });
        Ok(())
    }
}

/// Recovery action replaying scripted outcomes, then `fallback`
#[derive(Debug, Clone)]
pub struct ScriptedActionHandler {
    outcomes: Arc<Mutex<VecDeque<bool>>>,
    fallback: bool,
    calls: Arc<Mutex<u32>>,
}

impl ScriptedActionHandler {
    pub fn new(outcomes: Vec<bool>, fallback: bool) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            fallback,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Vec::new(), true)
    }

    pub fn failing() -> Self {
        Self::new(Vec::new(), false)
    }

    pub async fn calls(&self) -> u32 {
        *self.calls.lock().await
    }
}

#[async_trait]
impl ActionHandler for ScriptedActionHandler {
    async fn execute(&self, event: &ErrorEvent) -> Result<(), CollaboratorError> {
        *self.calls.lock().await += 1;
        let success = self
            .outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or(self.fallback);
        if success {
            Ok(())
        } else {
            Err(CollaboratorError::new(format!(
                "scripted failure for {}",
                event.component
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_steps_then_default_success() {
        let trading = ScriptedTradingCollaborator::new();
        trading
            .script(
                "selection",
                vec![ScriptedStep::Fail(CollaboratorError::new("no candidates"))],
            )
            .await;

        assert!(trading.run_selection().await.is_err());
        assert!(trading.run_selection().await.is_ok());
        assert_eq!(trading.call_count("selection").await, 2);
        assert_eq!(trading.calls().await, vec!["selection", "selection"]);
    }

    #[tokio::test]
    async fn test_trainer_fails_then_succeeds() {
        let trainer = ScriptedTrainer::failing_first(1);
        assert!(trainer.train(&[]).await.is_err());
        assert_eq!(trainer.train(&[]).await.unwrap().model_version, "model-v2");
        assert_eq!(trainer.runs().await, 2);
    }
}
