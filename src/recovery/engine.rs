use super::actions::ActionRegistry;
use super::rules::{default_rules, RecoveryAction, RecoveryRule, RecoveryRuleSpec, RuleTable};
use crate::core::{Clock, ErrorEvent, EventId, Severity};
use crate::error::ConfigError;
use crate::persistence::{self, keys, StateStore};
use crate::traits::{notify_quietly, Notifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Backoff between passes over an action chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before pass `pass + 1`
    pub fn delay_for(&self, pass: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(pass.min(32) as i32);
        let millis = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Error recovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub rules: Vec<RecoveryRuleSpec>,
    pub retry: RetryConfig,
    pub action_timeout_secs: u64,
    pub event_retention_hours: i64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            retry: RetryConfig::default(),
            action_timeout_secs: 30,
            event_retention_hours: 24,
        }
    }
}

impl RecoveryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        RuleTable::compile(&self.rules)?;
        if self.action_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "recovery.action_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.event_retention_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "recovery.event_retention_hours".to_string(),
                value: self.event_retention_hours.to_string(),
            });
        }
        Ok(())
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

/// Recovery state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryPhase {
    Detected,
    Matching,
    Recovering,
    Recovered,
    Exhausted,
    /// No rule applied; surfaced without recovery
    Unmatched,
    /// Rule matched but is cooling down for this component
    CoolingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// One action tried for one error event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    pub id: Uuid,
    pub rule_id: String,
    pub error_event_id: EventId,
    pub component: String,
    pub action_taken: RecoveryAction,
    pub outcome: AttemptOutcome,
    pub duration_ms: u64,
    pub attempt_number: u32,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<String>,
}

/// Result of handling one error event
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryReport {
    pub event: ErrorEvent,
    pub rule_id: Option<String>,
    pub phase: RecoveryPhase,
    pub transitions: Vec<RecoveryPhase>,
    pub attempts: Vec<RecoveryAttempt>,
}

/// Recovery statistics over the retention window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStats {
    pub window_hours: i64,
    pub events_by_severity: BTreeMap<Severity, usize>,
    pub total_events: usize,
    pub recovered: usize,
    pub exhausted: usize,
    pub unmatched: usize,
    pub cooling_down: usize,
    pub attempts: usize,
    /// recovered / (recovered + exhausted), `None` without completed cycles
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone)]
struct CycleRecord {
    at: DateTime<Utc>,
    phase: RecoveryPhase,
}

#[derive(Default)]
struct EngineState {
    /// Completion time of the last cycle per (rule, component)
    last_cycle: HashMap<(String, String), DateTime<Utc>>,
    events: VecDeque<ErrorEvent>,
    cycles: VecDeque<CycleRecord>,
    attempts: VecDeque<RecoveryAttempt>,
}

impl EngineState {
    fn prune(&mut self, cutoff: DateTime<Utc>) {
        while self.events.front().map_or(false, |e| e.timestamp < cutoff) {
            self.events.pop_front();
        }
        while self.cycles.front().map_or(false, |c| c.at < cutoff) {
            self.cycles.pop_front();
        }
        while self.attempts.front().map_or(false, |a| a.timestamp < cutoff) {
            self.attempts.pop_front();
        }
    }
}

/// Matches error events against the rule table and runs recovery chains.
///
/// Events are processed one at a time, so two chains never act on the same
/// rule and component concurrently.
pub struct ErrorRecoveryEngine {
    rules: RuleTable,
    actions: ActionRegistry,
    retry: RetryConfig,
    retention: chrono::Duration,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
}

impl ErrorRecoveryEngine {
    /// Create a new engine, compiling the rule table
    pub fn new(
        config: &RecoveryConfig,
        actions: ActionRegistry,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rules: RuleTable::compile(&config.rules)?,
            actions,
            retry: config.retry.clone(),
            retention: chrono::Duration::hours(config.event_retention_hours),
            notifier,
            store,
            clock,
            state: Mutex::new(EngineState::default()),
        })
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Build and handle an event stamped with the engine clock
    pub async fn report(
        &self,
        component: &str,
        message: &str,
        severity: Severity,
    ) -> RecoveryReport {
        let event = ErrorEvent::new(component, message, severity, self.clock.now());
        self.handle_event(event).await
    }

    /// Run one event through DETECTED, MATCHING and, when a rule applies and
    /// is not cooling down, RECOVERING.
    pub async fn handle_event(&self, event: ErrorEvent) -> RecoveryReport {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        state.prune(now - self.retention);

        let mut transitions = vec![RecoveryPhase::Detected];
        info!(
            "Error detected in {} [{}]: {}",
            event.component, event.severity, event.message
        );

        if event.severity == Severity::Critical {
            notify_quietly(
                self.notifier.as_ref(),
                Severity::Critical,
                &format!("CRITICAL error in {}: {}", event.component, event.message),
                &json!({ "event": &event }),
            )
            .await;
        }

        transitions.push(RecoveryPhase::Matching);
        let rule = match self.rules.select(&event) {
            Some(rule) => rule,
            None => {
                warn!("No recovery rule matches '{}'", event.match_text());
                self.record_event(&mut state, &event).await;
                state.cycles.push_back(CycleRecord {
                    at: now,
                    phase: RecoveryPhase::Unmatched,
                });
                if event.severity != Severity::Critical {
                    notify_quietly(
                        self.notifier.as_ref(),
                        event.severity,
                        &format!("Unhandled error in {}: {}", event.component, event.message),
                        &json!({ "event": &event }),
                    )
                    .await;
                }
                transitions.push(RecoveryPhase::Unmatched);
                return RecoveryReport {
                    event,
                    rule_id: None,
                    phase: RecoveryPhase::Unmatched,
                    transitions,
                    attempts: Vec::new(),
                };
            }
        };

        let event = event.with_rule(&rule.id);
        self.record_event(&mut state, &event).await;

        let key = (rule.id.clone(), event.component.clone());
        if let Some(last) = state.last_cycle.get(&key) {
            let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < rule.cooldown {
                info!(
                    rule = %rule.id,
                    component = %event.component,
                    "Rule cooling down ({:?} of {:?} elapsed), not re-attempting",
                    elapsed,
                    rule.cooldown
                );
                state.cycles.push_back(CycleRecord {
                    at: now,
                    phase: RecoveryPhase::CoolingDown,
                });
                transitions.push(RecoveryPhase::CoolingDown);
                return RecoveryReport {
                    event,
                    rule_id: Some(rule.id.clone()),
                    phase: RecoveryPhase::CoolingDown,
                    transitions,
                    attempts: Vec::new(),
                };
            }
        }

        transitions.push(RecoveryPhase::Recovering);
        let attempts = self.run_chain(rule, &event).await;
        let recovered = attempts
            .last()
            .map_or(false, |a| a.outcome == AttemptOutcome::Success);
        let phase = if recovered {
            RecoveryPhase::Recovered
        } else {
            RecoveryPhase::Exhausted
        };

        let finished = self.clock.now();
        state.last_cycle.insert(key, finished);
        state.cycles.push_back(CycleRecord {
            at: finished,
            phase,
        });
        state.attempts.extend(attempts.iter().cloned());
        transitions.push(phase);

        if recovered {
            info!(
                "Recovered {} via {} after {} attempt(s)",
                event.component,
                rule.id,
                attempts.len()
            );
        } else {
            error!(
                "Recovery exhausted for {} via {} after {} attempt(s)",
                event.component,
                rule.id,
                attempts.len()
            );
            notify_quietly(
                self.notifier.as_ref(),
                event.severity.max(Severity::High),
                &format!(
                    "Recovery exhausted for {} ({}): {}",
                    event.component, rule.id, event.message
                ),
                &json!({ "event": &event, "attempts": &attempts }),
            )
            .await;
        }

        RecoveryReport {
            event,
            rule_id: Some(rule.id.clone()),
            phase,
            transitions,
            attempts,
        }
    }

    /// Try the chain in order until an action succeeds or `max_attempts`
    /// actions were invoked, backing off between passes.
    async fn run_chain(&self, rule: &RecoveryRule, event: &ErrorEvent) -> Vec<RecoveryAttempt> {
        let mut attempts = Vec::new();
        let mut pass = 0u32;

        loop {
            for action in rule.action_chain.iter().copied() {
                if attempts.len() as u32 >= rule.max_attempts {
                    return attempts;
                }

                let result = self.actions.execute(action, event).await;
                let attempt = RecoveryAttempt {
                    id: Uuid::new_v4(),
                    rule_id: rule.id.clone(),
                    error_event_id: event.id,
                    component: event.component.clone(),
                    action_taken: action,
                    outcome: if result.success {
                        AttemptOutcome::Success
                    } else {
                        AttemptOutcome::Failure
                    },
                    duration_ms: result.duration.as_millis() as u64,
                    attempt_number: attempts.len() as u32 + 1,
                    timestamp: self.clock.now(),
                    detail: result.detail,
                };

                debug!(
                    "Attempt {} of {}: {} -> {:?}",
                    attempt.attempt_number, rule.id, action, attempt.outcome
                );
                if let Err(e) =
                    persistence::append(self.store.as_ref(), keys::RECOVERY_ATTEMPTS, &attempt).await
                {
                    warn!("Failed to persist recovery attempt: {}", e);
                }

                let success = attempt.outcome == AttemptOutcome::Success;
                attempts.push(attempt);
                if success {
                    return attempts;
                }
            }

            if attempts.len() as u32 >= rule.max_attempts {
                return attempts;
            }

            let delay = self.retry.delay_for(pass);
            debug!("Chain {} failed pass {}, backing off {:?}", rule.id, pass + 1, delay);
            tokio::time::sleep(delay).await;
            pass += 1;
        }
    }

    async fn record_event(&self, state: &mut EngineState, event: &ErrorEvent) {
        state.events.push_back(event.clone());
        if let Err(e) = persistence::append(self.store.as_ref(), keys::ERROR_EVENTS, event).await {
            warn!("Failed to persist error event: {}", e);
        }
    }

    /// Counts and success rate over the retention window
    pub async fn stats(&self) -> RecoveryStats {
        let mut state = self.state.lock().await;
        state.prune(self.clock.now() - self.retention);

        let mut events_by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for event in &state.events {
            *events_by_severity.entry(event.severity).or_insert(0) += 1;
        }

        let count = |phase: RecoveryPhase| state.cycles.iter().filter(|c| c.phase == phase).count();
        let recovered = count(RecoveryPhase::Recovered);
        let exhausted = count(RecoveryPhase::Exhausted);
        let completed = recovered + exhausted;

        RecoveryStats {
            window_hours: self.retention.num_hours(),
            events_by_severity,
            total_events: state.events.len(),
            recovered,
            exhausted,
            unmatched: count(RecoveryPhase::Unmatched),
            cooling_down: count(RecoveryPhase::CoolingDown),
            attempts: state.attempts.len(),
            success_rate: if completed > 0 {
                Some(recovered as f64 / completed as f64)
            } else {
                None
            },
        }
    }

    /// Attempts within the retention window, oldest first
    pub async fn recent_attempts(&self) -> Vec<RecoveryAttempt> {
        self.state.lock().await.attempts.iter().cloned().collect()
    }

    /// Time left before `rule_id` may act on `component` again
    pub async fn cooldown_remaining(&self, rule_id: &str, component: &str) -> Option<Duration> {
        let rule = self.rules.get(rule_id)?;
        let state = self.state.lock().await;
        let last = state
            .last_cycle
            .get(&(rule_id.to_string(), component.to_string()))?;
        let elapsed = (self.clock.now() - *last).to_std().unwrap_or(Duration::ZERO);
        rule.cooldown.checked_sub(elapsed).filter(|d| !d.is_zero())
    }
}
