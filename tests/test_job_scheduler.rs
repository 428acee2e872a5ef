//! Job scheduler over the default daily workflow
//!
//! These tests verify:
//! - a timed-out job is reported once at HIGH and the day continues
//! - a failed stage skips only the jobs that depend on it
//! - completed stages survive a restart and are not repeated
//! - a latched retrain left untrained is finished when the scheduler starts

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone, Utc};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;
use trade_autopilot::connectors::{
    DryRunBacktest, RecordingNotifier, ScriptedActionHandler, ScriptedStep,
    ScriptedTradingCollaborator, ScriptedTrainer,
};
use trade_autopilot::core::{Clock, ManualClock, Severity, Stage};
use trade_autopilot::error::CollaboratorError;
use trade_autopilot::learning::{AdaptiveLearningController, LearningConfig};
use trade_autopilot::performance::PerformanceStore;
use trade_autopilot::persistence::{FileStore, MemoryStore, StateStore};
use trade_autopilot::recovery::{ActionRegistry, ErrorRecoveryEngine, RecoveryAction, RecoveryConfig};
use trade_autopilot::retrain::{AutoRetrainTrigger, RetrainConfig, TriggerInputs};
use trade_autopilot::scheduler::{
    Collaborators, JobScheduler, JobStatus, SchedulerConfig, SchedulerContext,
};
use trade_autopilot::traits::{CollaboratorReport, TradingCollaborator};

mock! {
    pub Trading {}

    #[async_trait]
    impl TradingCollaborator for Trading {
        async fn run_screening(&self) -> Result<CollaboratorReport, CollaboratorError>;
        async fn run_selection(&self) -> Result<CollaboratorReport, CollaboratorError>;
        async fn start_trading(&self) -> Result<CollaboratorReport, CollaboratorError>;
        async fn stop_trading(&self) -> Result<CollaboratorReport, CollaboratorError>;
    }
}

struct Harness {
    scheduler: Arc<JobScheduler>,
    clock: ManualClock,
    notifier: RecordingNotifier,
    trainer: ScriptedTrainer,
    recovery: Arc<ErrorRecoveryEngine>,
    retrain: Arc<AutoRetrainTrigger>,
}

fn monday(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
    // 2024-03-04 is a Monday
    Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
}

fn harness(
    config: SchedulerConfig,
    trading: Arc<dyn TradingCollaborator>,
    store: Arc<dyn StateStore>,
    clock: ManualClock,
) -> Harness {
    let offset = FixedOffset::east_opt(0).unwrap();
    let notifier = RecordingNotifier::new();
    let trainer = ScriptedTrainer::new();

    let mut actions = ActionRegistry::new(Duration::from_secs(1));
    for action in RecoveryAction::ALL {
        actions.register(action, Arc::new(ScriptedActionHandler::succeeding()));
    }
    let recovery = Arc::new(
        ErrorRecoveryEngine::new(
            &RecoveryConfig::default(),
            actions,
            Arc::new(notifier.clone()),
            store.clone(),
            Arc::new(clock.clone()),
        )
        .unwrap(),
    );

    let performance = Arc::new(PerformanceStore::new(store.clone()));
    let retrain = Arc::new(AutoRetrainTrigger::new(
        RetrainConfig::default(),
        performance.clone(),
        store.clone(),
        Arc::new(clock.clone()),
        offset,
    ));
    let ctx = SchedulerContext {
        store: store.clone(),
        clock: Arc::new(clock.clone()),
        performance: performance.clone(),
        learning: Arc::new(AdaptiveLearningController::new(
            LearningConfig::default(),
            performance,
            store,
            Arc::new(clock.clone()),
            offset,
        )),
        retrain: retrain.clone(),
        recovery: recovery.clone(),
    };
    let collaborators = Collaborators {
        trading,
        backtest: Arc::new(DryRunBacktest),
        training: Arc::new(trainer.clone()),
        notifier: Arc::new(notifier.clone()),
    };

    Harness {
        scheduler: Arc::new(JobScheduler::new(&config, ctx, collaborators).unwrap()),
        clock,
        notifier,
        trainer,
        recovery,
        retrain,
    }
}

fn short_timeouts() -> SchedulerConfig {
    let mut config = SchedulerConfig::default();
    for job in &mut config.jobs {
        job.timeout_secs = 1;
    }
    config
}

// =============================================================================
// Timeouts and failures
// =============================================================================

#[tokio::test]
async fn test_timed_out_job_reported_once_and_day_continues() {
    let trading = ScriptedTradingCollaborator::new();
    trading
        .script(
            "start_trading",
            vec![ScriptedStep::Delay(Duration::from_secs(3))],
        )
        .await;
    let clock = ManualClock::new(monday(7, 0));
    let h = harness(
        short_timeouts(),
        Arc::new(trading.clone()),
        Arc::new(MemoryStore::new()),
        clock,
    );

    h.scheduler.arm(h.clock.now()).await;
    h.clock.set(monday(16, 45));
    let outcomes = h.scheduler.tick(h.clock.now()).await;

    let statuses: Vec<(&str, JobStatus)> = outcomes
        .iter()
        .map(|o| (o.job_id.as_str(), o.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("screening", JobStatus::Success),
            ("selection", JobStatus::Success),
            ("start_trading", JobStatus::TimedOut),
            ("stop_trading", JobStatus::Skipped),
            ("daily_analysis", JobStatus::Success),
        ]
    );

    let stats = h.recovery.stats().await;
    assert_eq!(stats.total_events, 1);
    assert_eq!(stats.events_by_severity.get(&Severity::High), Some(&1));
    assert!(h
        .notifier
        .sent()
        .await
        .iter()
        .any(|n| n.message.starts_with("Job start_trading TIMED_OUT")));
}

#[tokio::test]
async fn test_failed_selection_never_starts_trading() {
    let mut trading = MockTrading::new();
    trading
        .expect_run_screening()
        .times(1)
        .returning(|| Ok(CollaboratorReport::with_message("120 candidates")));
    trading
        .expect_run_selection()
        .times(2)
        .returning(|| Err(CollaboratorError::new("selection file missing")));
    trading.expect_start_trading().times(0);
    trading.expect_stop_trading().times(0);

    let h = harness(
        SchedulerConfig::default(),
        Arc::new(trading),
        Arc::new(MemoryStore::new()),
        ManualClock::new(monday(8, 0)),
    );

    for id in ["screening", "selection", "start_trading", "stop_trading"] {
        h.scheduler.run_job(id, false).await.unwrap();
    }

    let status = h.scheduler.status().await.unwrap();
    let statuses: Vec<JobStatus> = status.recent_jobs.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            JobStatus::Success,
            JobStatus::Failed,
            JobStatus::Skipped,
            JobStatus::Skipped,
        ]
    );
    assert!(status.workflow.is_completed(Stage::Screen));
    assert!(!status.workflow.is_completed(Stage::Select));
    assert_eq!(status.recovery.total_events, 2);
}

// =============================================================================
// Persistence across restarts
// =============================================================================

#[tokio::test]
async fn test_restart_resumes_mid_day() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(monday(8, 45));

    {
        let store: Arc<dyn StateStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let trading = ScriptedTradingCollaborator::new();
        let h = harness(SchedulerConfig::default(), Arc::new(trading), store, clock.clone());
        h.scheduler.run_job("screening", false).await.unwrap();
        h.scheduler.run_job("selection", false).await.unwrap();
    }

    let store: Arc<dyn StateStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let trading = ScriptedTradingCollaborator::new();
    let h = harness(
        SchedulerConfig::default(),
        Arc::new(trading.clone()),
        store,
        clock.clone(),
    );

    let screening = h.scheduler.run_job("screening", false).await.unwrap();
    assert_eq!(screening.status, JobStatus::Skipped);
    let start = h.scheduler.run_job("start_trading", false).await.unwrap();
    assert_eq!(start.status, JobStatus::Success);
    assert_eq!(trading.calls().await, vec!["start_trading"]);

    // Next day starts from scratch
    clock.set(Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap());
    let workflow = h.scheduler.workflow().await.unwrap();
    assert!(workflow.stages_completed_today.is_empty());
    let screening = h.scheduler.run_job("screening", false).await.unwrap();
    assert_eq!(screening.status, JobStatus::Success);
}

#[tokio::test]
async fn test_pending_training_finished_on_start() {
    let h = harness(
        SchedulerConfig::default(),
        Arc::new(ScriptedTradingCollaborator::new()),
        Arc::new(MemoryStore::new()),
        ManualClock::new(monday(6, 0)),
    );
    // Latched before a crash, training never ran
    h.retrain
        .evaluate_with(TriggerInputs {
            trading_days: 60.0,
            selection_records: 3700.0,
            performance_records: 30.0,
            win_rate: 0.50,
        })
        .await
        .unwrap();

    let runner = {
        let scheduler = h.scheduler.clone();
        tokio::spawn(async move { scheduler.run_forever().await })
    };

    // Wait for the training run and the backtest it triggers
    for _ in 0..100 {
        let status = h.scheduler.status().await.unwrap();
        if status
            .recent_jobs
            .iter()
            .any(|o| o.job_id == "post_retrain_backtest")
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    h.scheduler.stop().await;
    runner.abort();

    assert_eq!(h.trainer.runs().await, 1);
    let state = h.retrain.state().await.unwrap();
    assert!(state.training_invoked);
    assert_eq!(state.model_version.as_deref(), Some("model-v1"));

    let status = h.scheduler.status().await.unwrap();
    assert!(status.workflow.is_completed(Stage::MlTraining));
    assert!(status.retrain.training_invoked);
    assert!(status
        .recent_jobs
        .iter()
        .any(|o| o.job_id == "post_retrain_backtest" && o.status == JobStatus::Success));
}

// =============================================================================
// Daily report
// =============================================================================

#[tokio::test]
async fn test_daily_report_flags_failures() {
    let trading = ScriptedTradingCollaborator::new();
    trading
        .script(
            "screening",
            vec![
                ScriptedStep::Fail(CollaboratorError::new("exchange closed")),
                ScriptedStep::Fail(CollaboratorError::new("exchange closed")),
            ],
        )
        .await;
    let h = harness(
        SchedulerConfig::default(),
        Arc::new(trading),
        Arc::new(MemoryStore::new()),
        ManualClock::new(monday(8, 0)),
    );

    h.scheduler.run_job("screening", false).await.unwrap();
    h.scheduler.run_job("selection", false).await.unwrap();
    h.clock.set(monday(17, 30));
    let report = h.scheduler.run_job("daily_report", false).await.unwrap();
    assert_eq!(report.status, JobStatus::Success);

    let sent = h.notifier.sent().await;
    let daily = sent
        .iter()
        .find(|n| n.message.starts_with("Daily report"))
        .unwrap();
    assert_eq!(daily.severity, Severity::High);
    assert!(daily.message.contains("failed: screening"));
    assert!(daily.message.contains("skipped: selection"));
    assert_eq!(daily.context["failed"][0], "screening");
}
