//! Error recovery engine: rule matching, action chains, cooldowns and escalation
//!
//! These tests verify:
//! - a matched event runs its chain until the first successful action
//! - events for the same rule and component within the cooldown act once
//! - an exhausted chain escalates with the attempt history
//! - CRITICAL events always notify

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use mockall::mock;
use std::sync::Arc;
use trade_autopilot::connectors::{RecordingNotifier, ScriptedActionHandler};
use trade_autopilot::core::{Clock, ErrorEvent, ManualClock, Severity};
use trade_autopilot::error::CollaboratorError;
use trade_autopilot::persistence::{self, keys, MemoryStore, StateStore};
use trade_autopilot::recovery::{
    ActionHandler, ActionRegistry, AttemptOutcome, ErrorRecoveryEngine, RecoveryAction,
    RecoveryAttempt, RecoveryConfig, RecoveryPhase, RetryConfig,
};

mock! {
    pub Action {}

    #[async_trait]
    impl ActionHandler for Action {
        async fn execute(&self, event: &ErrorEvent) -> Result<(), CollaboratorError>;
    }
}

struct Setup {
    engine: ErrorRecoveryEngine,
    clock: ManualClock,
    notifier: RecordingNotifier,
    store: Arc<dyn StateStore>,
}

fn fast_config() -> RecoveryConfig {
    RecoveryConfig {
        retry: RetryConfig {
            initial_delay_ms: 1,
            max_delay_ms: 5,
            multiplier: 2.0,
        },
        ..RecoveryConfig::default()
    }
}

fn setup(actions: ActionRegistry) -> Setup {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());
    let notifier = RecordingNotifier::new();
    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let engine = ErrorRecoveryEngine::new(
        &fast_config(),
        actions,
        Arc::new(notifier.clone()),
        store.clone(),
        Arc::new(clock.clone()),
    )
    .unwrap();
    Setup {
        engine,
        clock,
        notifier,
        store,
    }
}

fn registry_with(handler: ScriptedActionHandler) -> ActionRegistry {
    let mut registry = ActionRegistry::new(std::time::Duration::from_secs(1));
    let handler: Arc<dyn ActionHandler> = Arc::new(handler);
    for action in RecoveryAction::ALL {
        registry.register(action, handler.clone());
    }
    registry
}

// =============================================================================
// Matching and chains
// =============================================================================

#[tokio::test]
async fn test_api_timeout_recovered_by_first_action() {
    let mut reset = MockAction::new();
    reset.expect_execute().times(1).returning(|_| Ok(()));
    let mut restart = MockAction::new();
    restart.expect_execute().times(0);

    let registry = ActionRegistry::new(std::time::Duration::from_secs(1))
        .with_handler(RecoveryAction::ResetConnection, Arc::new(reset))
        .with_handler(RecoveryAction::RestartService, Arc::new(restart));
    let s = setup(registry);

    let report = s
        .engine
        .report("broker", "API request timeout after 30s", Severity::High)
        .await;

    assert_eq!(report.rule_id.as_deref(), Some("api_timeout"));
    assert_eq!(report.phase, RecoveryPhase::Recovered);
    assert_eq!(
        report.transitions,
        vec![
            RecoveryPhase::Detected,
            RecoveryPhase::Matching,
            RecoveryPhase::Recovering,
            RecoveryPhase::Recovered,
        ]
    );
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].action_taken, RecoveryAction::ResetConnection);

    let persisted: Vec<RecoveryAttempt> =
        persistence::load_log(s.store.as_ref(), keys::RECOVERY_ATTEMPTS)
            .await
            .unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].outcome, AttemptOutcome::Success);
    assert_eq!(persisted[0].attempt_number, 1);

    let events: Vec<ErrorEvent> = persistence::load_log(s.store.as_ref(), keys::ERROR_EVENTS)
        .await
        .unwrap();
    assert_eq!(events[0].matched_rule_id.as_deref(), Some("api_timeout"));
}

#[tokio::test]
async fn test_chain_moves_on_after_failure() {
    let s = setup(registry_with(ScriptedActionHandler::new(vec![false, true], false)));

    let report = s
        .engine
        .report("broker", "API request timed out", Severity::Medium)
        .await;

    assert_eq!(report.phase, RecoveryPhase::Recovered);
    let actions: Vec<RecoveryAction> = report.attempts.iter().map(|a| a.action_taken).collect();
    assert_eq!(
        actions,
        vec![RecoveryAction::ResetConnection, RecoveryAction::RestartService]
    );
}

#[tokio::test]
async fn test_below_severity_threshold_is_unmatched() {
    let handler = ScriptedActionHandler::succeeding();
    let s = setup(registry_with(handler.clone()));

    // memory_pressure needs HIGH; the connection rule does not apply either
    let report = s
        .engine
        .report("worker", "out of memory while caching", Severity::Medium)
        .await;

    assert_eq!(report.phase, RecoveryPhase::Unmatched);
    assert!(report.attempts.is_empty());
    assert_eq!(handler.calls().await, 0);
    assert_eq!(s.notifier.count_at(Severity::Medium).await, 1);
}

#[tokio::test]
async fn test_first_matching_rule_wins() {
    let s = setup(registry_with(ScriptedActionHandler::succeeding()));

    // Matches both api_timeout and connection_lost
    let report = s
        .engine
        .report("broker", "http connection timeout", Severity::High)
        .await;
    assert_eq!(report.rule_id.as_deref(), Some("api_timeout"));
}

// =============================================================================
// Cooldown
// =============================================================================

#[tokio::test]
async fn test_cooldown_allows_one_chain_per_component() {
    let handler = ScriptedActionHandler::succeeding();
    let s = setup(registry_with(handler.clone()));

    let first = s
        .engine
        .report("broker", "API request timeout", Severity::High)
        .await;
    s.clock.advance(Duration::seconds(30));
    let second = s
        .engine
        .report("broker", "API request timeout", Severity::High)
        .await;

    assert_eq!(first.phase, RecoveryPhase::Recovered);
    assert_eq!(second.phase, RecoveryPhase::CoolingDown);
    assert!(second.attempts.is_empty());
    assert_eq!(handler.calls().await, 1);
    assert_eq!(s.engine.recent_attempts().await.len(), 1);

    let remaining = s.engine.cooldown_remaining("api_timeout", "broker").await;
    assert_eq!(remaining, Some(std::time::Duration::from_secs(270)));

    // Another component is not cooling down
    let other = s
        .engine
        .report("market_data", "API request timeout", Severity::High)
        .await;
    assert_eq!(other.phase, RecoveryPhase::Recovered);

    // Cooldown over
    s.clock.advance(Duration::seconds(271));
    let third = s
        .engine
        .report("broker", "API request timeout", Severity::High)
        .await;
    assert_eq!(third.phase, RecoveryPhase::Recovered);
    assert_eq!(handler.calls().await, 3);

    let stats = s.engine.stats().await;
    assert_eq!(stats.recovered, 3);
    assert_eq!(stats.cooling_down, 1);
    assert_eq!(stats.success_rate, Some(1.0));
}

// =============================================================================
// Escalation
// =============================================================================

#[tokio::test]
async fn test_exhausted_chain_escalates() {
    let handler = ScriptedActionHandler::failing();
    let s = setup(registry_with(handler.clone()));

    let report = s
        .engine
        .report("storage", "database connection refused", Severity::Medium)
        .await;

    assert_eq!(report.rule_id.as_deref(), Some("database_failure"));
    assert_eq!(report.phase, RecoveryPhase::Exhausted);
    assert_eq!(report.attempts.len(), 3);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::Failure));
    let numbers: Vec<u32> = report.attempts.iter().map(|a| a.attempt_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(handler.calls().await, 3);

    let sent = s.notifier.sent().await;
    let escalation = sent
        .iter()
        .find(|n| n.message.starts_with("Recovery exhausted"))
        .unwrap();
    assert_eq!(escalation.severity, Severity::High);
    assert_eq!(escalation.context["attempts"].as_array().map(Vec::len), Some(3));

    let stats = s.engine.stats().await;
    assert_eq!(stats.exhausted, 1);
    assert_eq!(stats.success_rate, Some(0.0));
}

#[tokio::test]
async fn test_missing_handler_counts_as_failure() {
    let s = setup(ActionRegistry::new(std::time::Duration::from_secs(1)));

    let report = s
        .engine
        .report("broker", "lost connection to gateway", Severity::Low)
        .await;
    assert_eq!(report.rule_id.as_deref(), Some("connection_lost"));
    assert_eq!(report.phase, RecoveryPhase::Exhausted);
    assert_eq!(report.attempts.len(), 2);
}

#[tokio::test]
async fn test_critical_always_notifies() {
    let s = setup(registry_with(ScriptedActionHandler::succeeding()));

    for _ in 0..2 {
        s.engine
            .report("system", "memory usage 97.0% exceeds 95.0%", Severity::Critical)
            .await;
        s.clock.advance(Duration::seconds(10));
    }

    // Second event is cooling down but still notified
    assert_eq!(s.notifier.count_at(Severity::Critical).await, 2);
    let stats = s.engine.stats().await;
    assert_eq!(stats.events_by_severity.get(&Severity::Critical), Some(&2));
    assert_eq!(stats.cooling_down, 1);
}

#[tokio::test]
async fn test_events_expire_from_statistics() {
    let s = setup(registry_with(ScriptedActionHandler::succeeding()));
    s.engine
        .report("broker", "API request timeout", Severity::High)
        .await;
    assert_eq!(s.engine.stats().await.total_events, 1);

    s.clock.advance(Duration::hours(25));
    let stats = s.engine.stats().await;
    assert_eq!(stats.total_events, 0);
    assert_eq!(stats.success_rate, None);
    assert!(s.clock.now() > Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
}
