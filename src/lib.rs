//! Autonomous operations core for an algorithmic trading platform.
//!
//! A [`JobScheduler`] drives the daily workflow, the
//! [`AdaptiveLearningController`] tunes strategy parameters from recent
//! performance, the [`AutoRetrainTrigger`] latches once enough history exists
//! for model retraining, and the [`ErrorRecoveryEngine`] turns reported
//! failures into bounded recovery chains.

pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod learning;
pub mod monitoring;
pub mod performance;
pub mod persistence;
pub mod recovery;
pub mod retrain;
pub mod scheduler;
pub mod traits;

pub use crate::config::AutopilotConfig;
pub use crate::core::{Clock, ErrorEvent, ManualClock, Severity, Stage, SystemClock};
pub use crate::error::{
    AutopilotError, CollaboratorError, ConfigError, NotifyError, Result, StoreError,
};
pub use crate::learning::{AdaptiveLearningController, LearningConfig, StrategyParameters};
pub use crate::monitoring::{AlertManager, HealthChecker, HealthMonitor, MonitorConfig};
pub use crate::performance::{PerformanceRecord, PerformanceStore, SelectionRecord};
pub use crate::persistence::{FileStore, MemoryStore, StateStore};
pub use crate::recovery::{
    ActionRegistry, ErrorRecoveryEngine, RecoveryAction, RecoveryConfig, RecoveryPhase,
    RecoveryStats,
};
pub use crate::retrain::{AutoRetrainTrigger, RetrainConfig, RetrainProgress, TriggerState};
pub use crate::scheduler::{
    Collaborators, JobDefinition, JobOutcome, JobScheduler, JobStatus, SchedulerConfig,
    SchedulerContext, StatusReport, WorkflowState,
};
pub use crate::traits::{
    BacktestCollaborator, Notifier, TradingCollaborator, TrainingCollaborator,
};

use std::path::Path;

/// Environment variable holding the log level
pub const ENV_LOG_LEVEL: &str = "AUTOPILOT_LOG_LEVEL";

/// Initialize logging to stdout and, optionally, a file.
///
/// `AUTOPILOT_LOG_LEVEL` overrides `level` when set.
pub fn init_logging(
    level: &str,
    file: Option<&Path>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let level = std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| level.to_string());
    let filter: log::LevelFilter = level
        .parse()
        .map_err(|_| format!("invalid log level '{}'", level))?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(filter)
        // Quiet the HTTP stack below warnings
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stdout());

    if let Some(path) = file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}
