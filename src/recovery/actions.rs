use super::rules::RecoveryAction;
use crate::core::ErrorEvent;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Executes one recovery action for an error event
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, event: &ErrorEvent) -> Result<(), CollaboratorError>;
}

/// Outcome of dispatching one action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    pub duration: Duration,
    pub detail: Option<String>,
}

/// Handlers by recovery action
pub struct ActionRegistry {
    handlers: HashMap<RecoveryAction, Arc<dyn ActionHandler>>,
    timeout: Duration,
}

impl ActionRegistry {
    /// Create a new registry; every action runs under `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            handlers: HashMap::new(),
            timeout,
        }
    }

    /// Add an action handler, replacing any previous one
    pub fn register(&mut self, action: RecoveryAction, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(action, handler);
    }

    pub fn with_handler(mut self, action: RecoveryAction, handler: Arc<dyn ActionHandler>) -> Self {
        self.register(action, handler);
        self
    }

    pub fn has_handler(&self, action: RecoveryAction) -> bool {
        self.handlers.contains_key(&action)
    }

    /// Run an action. A missing handler, an error and a timeout are all
    /// failures.
    pub async fn execute(&self, action: RecoveryAction, event: &ErrorEvent) -> ActionResult {
        let started = Instant::now();

        let handler = match self.handlers.get(&action) {
            Some(handler) => handler.clone(),
            None => {
                return ActionResult {
                    success: false,
                    duration: started.elapsed(),
                    detail: Some(format!("no handler registered for {}", action)),
                }
            }
        };

        let (success, detail) = match tokio::time::timeout(self.timeout, handler.execute(event)).await
        {
            Ok(Ok(())) => (true, None),
            Ok(Err(e)) => (false, Some(e.message)),
            Err(_) => (false, Some(format!("{} timed out after {:?}", action, self.timeout))),
        };

        ActionResult {
            success,
            duration: started.elapsed(),
            detail,
        }
    }
}

/// Handler that logs the action and reports success
#[derive(Debug, Clone)]
pub struct LoggingActionHandler {
    action: RecoveryAction,
}

impl LoggingActionHandler {
    pub fn new(action: RecoveryAction) -> Self {
        Self { action }
    }

    /// Registry with a logging handler for every action
    pub fn registry(timeout: Duration) -> ActionRegistry {
        RecoveryAction::ALL
            .iter()
            .fold(ActionRegistry::new(timeout), |registry, action| {
                registry.with_handler(*action, Arc::new(LoggingActionHandler::new(*action)))
            })
    }
}

#[async_trait]
impl ActionHandler for LoggingActionHandler {
    async fn execute(&self, event: &ErrorEvent) -> Result<(), CollaboratorError> {
        tracing::info!(
            "[dry-run] {} for {} ({})",
            self.action,
            event.component,
            event.message
        );
        Ok(())
    }
}
