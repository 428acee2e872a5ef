//! Background health monitor feeding the recovery engine
//!
//! These tests verify:
//! - a memory breach becomes a CRITICAL event handled by the memory rule
//! - an UNHEALTHY component becomes a HIGH event
//! - a repeated breach inside the cooldown starts no new chain
//! - the background loop polls until stopped

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use trade_autopilot::connectors::{RecordingNotifier, ScriptedActionHandler};
use trade_autopilot::core::{ManualClock, Severity};
use trade_autopilot::monitoring::{
    HealthChecker, HealthMonitor, HealthStatus, MonitorConfig, ResourceProbe, ResourceSample,
};
use trade_autopilot::persistence::MemoryStore;
use trade_autopilot::recovery::{
    ActionHandler, ActionRegistry, ErrorRecoveryEngine, RecoveryAction, RecoveryConfig,
    RecoveryPhase, RetryConfig,
};

struct FixedProbe(ResourceSample);

#[async_trait]
impl ResourceProbe for FixedProbe {
    async fn sample(&self) -> ResourceSample {
        self.0
    }
}

struct Setup {
    monitor: Arc<HealthMonitor>,
    checker: Arc<HealthChecker>,
    engine: Arc<ErrorRecoveryEngine>,
    clock: ManualClock,
    notifier: RecordingNotifier,
    handler: ScriptedActionHandler,
}

fn setup(sample: ResourceSample) -> Setup {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).unwrap());
    let notifier = RecordingNotifier::new();
    let handler = ScriptedActionHandler::succeeding();

    let mut actions = ActionRegistry::new(std::time::Duration::from_secs(1));
    let shared: Arc<dyn ActionHandler> = Arc::new(handler.clone());
    for action in RecoveryAction::ALL {
        actions.register(action, shared.clone());
    }
    let config = RecoveryConfig {
        retry: RetryConfig {
            initial_delay_ms: 1,
            max_delay_ms: 5,
            multiplier: 2.0,
        },
        ..RecoveryConfig::default()
    };
    let engine = Arc::new(
        ErrorRecoveryEngine::new(
            &config,
            actions,
            Arc::new(notifier.clone()),
            Arc::new(MemoryStore::new()),
            Arc::new(clock.clone()),
        )
        .unwrap(),
    );

    let checker = Arc::new(HealthChecker::new(Arc::new(clock.clone())));
    let monitor = Arc::new(HealthMonitor::new(
        MonitorConfig {
            interval_secs: 1,
            ..MonitorConfig::default()
        },
        Arc::new(FixedProbe(sample)),
        checker.clone(),
        engine.clone(),
    ));

    Setup {
        monitor,
        checker,
        engine,
        clock,
        notifier,
        handler,
    }
}

fn memory_at(percent: f64) -> ResourceSample {
    ResourceSample {
        memory_percent: Some(percent),
        ..ResourceSample::default()
    }
}

// =============================================================================
// Single passes
// =============================================================================

#[tokio::test]
async fn test_memory_breach_is_critical_and_recovered() {
    let s = setup(memory_at(96.0));

    let reports = s.monitor.check_once().await;
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.event.severity, Severity::Critical);
    assert_eq!(report.event.component, "system");
    assert_eq!(report.rule_id.as_deref(), Some("memory_pressure"));
    assert_eq!(report.phase, RecoveryPhase::Recovered);
    assert_eq!(report.attempts[0].action_taken, RecoveryAction::ClearCache);

    assert_eq!(s.notifier.count_at(Severity::Critical).await, 1);
    let stats = s.engine.stats().await;
    assert_eq!(stats.events_by_severity.get(&Severity::Critical), Some(&1));
}

#[tokio::test]
async fn test_unhealthy_component_is_a_high_event() {
    let s = setup(ResourceSample::default());
    s.checker
        .register_component("broker", HealthStatus::Unhealthy, "connection refused")
        .await;
    s.checker
        .register_component("scheduler", HealthStatus::Degraded, "job screening FAILED")
        .await;

    let reports = s.monitor.check_once().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].event.component, "broker");
    assert_eq!(reports[0].event.severity, Severity::High);
    assert_eq!(reports[0].rule_id.as_deref(), Some("connection_lost"));

    let stats = s.engine.stats().await;
    assert_eq!(stats.total_events, 1);
    assert_eq!(stats.events_by_severity.get(&Severity::High), Some(&1));
}

#[tokio::test]
async fn test_repeated_breach_inside_cooldown_starts_no_chain() {
    let s = setup(memory_at(96.0));

    s.monitor.check_once().await;
    assert_eq!(s.handler.calls().await, 1);

    s.clock.advance(Duration::seconds(60));
    let reports = s.monitor.check_once().await;
    assert_eq!(reports[0].phase, RecoveryPhase::CoolingDown);
    assert!(reports[0].attempts.is_empty());
    assert_eq!(s.handler.calls().await, 1);

    // CRITICAL is still notified while cooling down
    assert_eq!(s.notifier.count_at(Severity::Critical).await, 2);
}

#[tokio::test]
async fn test_healthy_system_reports_nothing() {
    let s = setup(memory_at(40.0));
    s.checker
        .register_component("scheduler", HealthStatus::Healthy, "started")
        .await;

    assert!(s.monitor.check_once().await.is_empty());
    assert_eq!(s.engine.stats().await.total_events, 0);
}

// =============================================================================
// Background loop
// =============================================================================

#[tokio::test]
async fn test_background_loop_polls_until_stopped() {
    let s = setup(memory_at(96.0));

    let handle = s.monitor.clone().start().await;
    assert!(s.monitor.is_running().await);

    // The first tick fires immediately
    for _ in 0..100 {
        if s.engine.stats().await.total_events > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    s.monitor.stop().await;
    handle.abort();

    assert!(!s.monitor.is_running().await);
    assert!(s.engine.stats().await.total_events >= 1);
    assert!(s.notifier.count_at(Severity::Critical).await >= 1);
}
