use log::{info, warn};
use std::env;
use std::sync::Arc;
use trade_autopilot::{
    config::AutopilotConfig,
    connectors::{DryRunBacktest, DryRunTradingCollaborator, DryRunTrainer, WebhookNotifier},
    core::{Clock, SystemClock},
    init_logging,
    learning::AdaptiveLearningController,
    monitoring::{AlertManager, HealthChecker, HealthMonitor, HealthStatus, ProcfsProbe},
    performance::PerformanceStore,
    persistence::{FileStore, StateStore},
    recovery::{ErrorRecoveryEngine, LoggingActionHandler},
    retrain::AutoRetrainTrigger,
    scheduler::{Collaborators, JobScheduler, SchedulerContext, SCHEDULER_COMPONENT},
    traits::Notifier,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info", None)?;

    // Config path from argv or AUTOPILOT_CONFIG
    let path = env::args()
        .nth(1)
        .or_else(|| env::var("AUTOPILOT_CONFIG").ok());
    let mut config = match path {
        Some(path) => AutopilotConfig::from_file(&path)?,
        None => {
            info!("No config file given, using the default workflow");
            AutopilotConfig::default()
        }
    };
    config.apply_env_overrides()?;
    config.validate()?;
    let offset = config.scheduler.offset()?;

    info!("Starting autopilot (dry-run collaborators, state in {})", config.state_dir.display());

    let store: Arc<dyn StateStore> = Arc::new(FileStore::open(&config.state_dir).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier: Arc<dyn Notifier> = match WebhookNotifier::from_env() {
        Some(webhook) => {
            info!("Sending notifications to the configured webhook");
            Arc::new(webhook?)
        }
        None => Arc::new(AlertManager::default()),
    };

    let recovery = Arc::new(ErrorRecoveryEngine::new(
        &config.recovery,
        LoggingActionHandler::registry(config.recovery.action_timeout()),
        notifier.clone(),
        store.clone(),
        clock.clone(),
    )?);
    let performance = Arc::new(PerformanceStore::new(store.clone()));
    let learning = Arc::new(AdaptiveLearningController::new(
        config.learning.clone(),
        performance.clone(),
        store.clone(),
        clock.clone(),
        offset,
    ));
    let retrain = Arc::new(AutoRetrainTrigger::new(
        config.retrain.clone(),
        performance.clone(),
        store.clone(),
        clock.clone(),
        offset,
    ));

    let checker = Arc::new(HealthChecker::new(clock.clone()));
    checker
        .register_component(SCHEDULER_COMPONENT, HealthStatus::Healthy, "started")
        .await;
    let monitor = Arc::new(HealthMonitor::new(
        config.monitor.clone(),
        Arc::new(ProcfsProbe::new()),
        checker.clone(),
        recovery.clone(),
    ));
    let monitor_handle = monitor.clone().start().await;

    let scheduler = Arc::new(JobScheduler::new(
        &config.scheduler,
        SchedulerContext {
            store,
            clock,
            performance,
            learning,
            retrain,
            recovery,
        },
        Collaborators {
            trading: Arc::new(DryRunTradingCollaborator::new()),
            backtest: Arc::new(DryRunBacktest),
            training: Arc::new(DryRunTrainer::new()),
            notifier,
        },
    )?
    .with_health(checker));

    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run_forever().await })
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    scheduler.stop().await;
    monitor.stop().await;

    match scheduler.status().await {
        Ok(status) => info!("Final status: {}", serde_json::to_string(&status)?),
        Err(e) => warn!("Could not read final status: {}", e),
    }

    runner.abort();
    monitor_handle.abort();
    info!("✅ Autopilot stopped");
    Ok(())
}
