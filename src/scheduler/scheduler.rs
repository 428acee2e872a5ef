use super::job::{
    CollaboratorTarget, ControllerTarget, JobAction, JobDefinition, JobOutcome, JobStatus,
    JobTrigger,
};
use super::report::{DailyReport, StatusReport};
use super::workflow::WorkflowState;
use crate::core::{Clock, Severity, Stage};
use crate::error::{AutopilotError, ConfigError, StoreError};
use crate::learning::{AdaptiveLearningController, StrategyParameters};
use crate::monitoring::{HealthChecker, HealthStatus};
use crate::performance::PerformanceStore;
use crate::persistence::{self, keys, StateStore};
use crate::recovery::ErrorRecoveryEngine;
use crate::retrain::AutoRetrainTrigger;
use crate::traits::{
    notify_quietly, BacktestCollaborator, CollaboratorReport, Notifier, TradingCollaborator,
    TrainingCollaborator, TrainingOutcome,
};
use chrono::{DateTime, FixedOffset, NaiveTime, Utc, Weekday};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};

/// Event emitted once a retraining run has completed
pub const RETRAIN_TRIGGERED_EVENT: &str = "retrain_triggered";

/// Name the scheduler reports its own health under
pub const SCHEDULER_COMPONENT: &str = "scheduler";

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed offset job times are evaluated in, e.g. `+09:00`
    pub utc_offset: String,
    /// Upper bound on how long the loop sleeps between checks
    pub poll_interval_secs: u64,
    /// Job outcomes kept for status queries
    pub history_limit: usize,
    pub jobs: Vec<JobDefinition>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset: "+00:00".to_string(),
            poll_interval_secs: 30,
            history_limit: 200,
            jobs: default_jobs(),
        }
    }
}

impl SchedulerConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_utc_offset(&self.utc_offset)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.offset()?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for job in &self.jobs {
            job.validate()?;
            if !seen.insert(job.id.as_str()) {
                return Err(ConfigError::DuplicateJob(job.id.clone()));
            }
        }
        Ok(())
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM`, `+HH`, `Z` or `UTC`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: "utc_offset".to_string(),
        value: value.to_string(),
    };

    let s = value.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };

    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    let seconds = (hours * 3600 + minutes * 60) as i32;
    FixedOffset::east_opt(sign * seconds).ok_or_else(invalid)
}

fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn collaborator(target: CollaboratorTarget) -> JobAction {
    JobAction::DelegateCollaborator {
        target,
        args: Value::Null,
    }
}

fn controller(target: ControllerTarget, args: Value) -> JobAction {
    JobAction::DelegateController { target, args }
}

/// The standard trading day
pub fn default_jobs() -> Vec<JobDefinition> {
    vec![
        JobDefinition::new(
            "screening",
            JobTrigger::Weekdays(at(8, 0)),
            collaborator(CollaboratorTarget::Screening),
            1800,
        )
        .with_stage(Stage::Screen)
        .with_retry(),
        JobDefinition::new(
            "selection",
            JobTrigger::Weekdays(at(8, 30)),
            collaborator(CollaboratorTarget::Selection),
            1800,
        )
        .with_stage(Stage::Select)
        .depending_on(Stage::Screen)
        .with_retry(),
        JobDefinition::new(
            "start_trading",
            JobTrigger::Weekdays(at(9, 30)),
            collaborator(CollaboratorTarget::StartTrading),
            300,
        )
        .with_stage(Stage::Trade)
        .depending_on(Stage::Select),
        JobDefinition::new(
            "stop_trading",
            JobTrigger::Weekdays(at(16, 0)),
            collaborator(CollaboratorTarget::StopTrading),
            300,
        )
        .depending_on(Stage::Trade),
        JobDefinition::new(
            "daily_analysis",
            JobTrigger::Weekdays(at(16, 30)),
            controller(
                ControllerTarget::AdjustParameters,
                json!({ "lookback_days": 5 }),
            ),
            600,
        )
        .with_stage(Stage::Analyze),
        JobDefinition::new(
            "retrain_check",
            JobTrigger::Weekdays(at(17, 0)),
            controller(ControllerTarget::EvaluateRetrain, Value::Null),
            3600,
        ),
        JobDefinition::new(
            "daily_report",
            JobTrigger::Weekdays(at(17, 30)),
            controller(ControllerTarget::DailyReport, Value::Null),
            120,
        ),
        JobDefinition::new(
            "weekly_backtest",
            JobTrigger::Weekly(Weekday::Sat, at(10, 0)),
            collaborator(CollaboratorTarget::Backtest),
            3600,
        ),
        JobDefinition::new(
            "post_retrain_backtest",
            JobTrigger::Event(RETRAIN_TRIGGERED_EVENT.to_string()),
            collaborator(CollaboratorTarget::Backtest),
            3600,
        ),
    ]
}

/// Components the scheduler drives
#[derive(Clone)]
pub struct SchedulerContext {
    pub store: Arc<dyn StateStore>,
    pub clock: Arc<dyn Clock>,
    pub performance: Arc<PerformanceStore>,
    pub learning: Arc<AdaptiveLearningController>,
    pub retrain: Arc<AutoRetrainTrigger>,
    pub recovery: Arc<ErrorRecoveryEngine>,
}

/// External collaborators
#[derive(Clone)]
pub struct Collaborators {
    pub trading: Arc<dyn TradingCollaborator>,
    pub backtest: Arc<dyn BacktestCollaborator>,
    pub training: Arc<dyn TrainingCollaborator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Serial job runner and sole writer of the workflow state.
///
/// Jobs never run concurrently: timed jobs, forced runs and event jobs all
/// take the same run lock. Failures are reported inline to the recovery
/// engine before the next job starts.
pub struct JobScheduler {
    jobs: Vec<JobDefinition>,
    offset: FixedOffset,
    poll_interval: Duration,
    history_limit: usize,
    ctx: SchedulerContext,
    collaborators: Collaborators,
    history: Arc<RwLock<VecDeque<JobOutcome>>>,
    next_runs: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    pending_events: Mutex<VecDeque<String>>,
    run_lock: Mutex<()>,
    running: Arc<RwLock<bool>>,
    health: Option<Arc<HealthChecker>>,
}

impl JobScheduler {
    /// Create a new scheduler with the configured jobs
    pub fn new(
        config: &SchedulerConfig,
        ctx: SchedulerContext,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut scheduler = Self {
            jobs: Vec::new(),
            offset: config.offset()?,
            poll_interval: config.poll_interval(),
            history_limit: config.history_limit.max(1),
            ctx,
            collaborators,
            history: Arc::new(RwLock::new(VecDeque::new())),
            next_runs: Arc::new(RwLock::new(HashMap::new())),
            pending_events: Mutex::new(VecDeque::new()),
            run_lock: Mutex::new(()),
            running: Arc::new(RwLock::new(false)),
            health: None,
        };
        for job in &config.jobs {
            scheduler.register(job.clone())?;
        }
        Ok(scheduler)
    }

    /// Report scheduler health into `checker` after every finished job.
    ///
    /// A failed or timed-out job leaves the scheduler DEGRADED until the next
    /// success; an unreadable workflow state makes it UNHEALTHY, which the
    /// health monitor keeps escalating.
    pub fn with_health(mut self, checker: Arc<HealthChecker>) -> Self {
        self.health = Some(checker);
        self
    }

    /// Add a job after the ones already registered
    pub fn register(&mut self, job: JobDefinition) -> Result<(), ConfigError> {
        job.validate()?;
        if self.job(&job.id).is_some() {
            return Err(ConfigError::DuplicateJob(job.id));
        }
        debug!("Registered job {} ({})", job.id, job.trigger);
        self.jobs.push(job);
        Ok(())
    }

    pub fn jobs(&self) -> &[JobDefinition] {
        &self.jobs
    }

    pub fn job(&self, id: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Run one job now, then any event jobs it emitted.
    ///
    /// `force` re-runs a stage already completed today; dependencies are
    /// still enforced.
    pub async fn run_job(&self, id: &str, force: bool) -> Result<JobOutcome, AutopilotError> {
        let job = self
            .job(id)
            .ok_or_else(|| AutopilotError::UnknownJob(id.to_string()))?;
        let outcome = self.execute(job, force).await;
        self.drain_events().await;
        Ok(outcome)
    }

    /// Run every enabled job subscribed to `name`, in declaration order
    pub async fn trigger_event(&self, name: &str) -> Vec<JobOutcome> {
        self.pending_events.lock().await.push_back(name.to_string());
        self.drain_events().await
    }

    async fn drain_events(&self) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let next = self.pending_events.lock().await.pop_front();
            let Some(name) = next else { break };

            info!("Dispatching event {}", name);
            for job in self.jobs.iter().filter(|j| j.trigger.is_event(&name)) {
                outcomes.push(self.execute(job, false).await);
            }
        }
        outcomes
    }

    async fn execute(&self, job: &JobDefinition, force: bool) -> JobOutcome {
        let _guard = self.run_lock.lock().await;
        let started_at = self.ctx.clock.now();

        if !job.enabled {
            return self
                .finish(job, JobStatus::Skipped, 0, started_at, Some("job disabled".to_string()))
                .await;
        }

        let workflow = match self.workflow().await {
            Ok(workflow) => workflow,
            Err(e) => {
                let message = format!("state store failure loading workflow: {}", e);
                error!("Job {}: {}", job.id, message);
                self.ctx
                    .recovery
                    .report(&job.id, &message, Severity::High)
                    .await;
                let outcome = self
                    .finish(job, JobStatus::Failed, 0, started_at, Some(message.clone()))
                    .await;
                self.report_health(HealthStatus::Unhealthy, &message).await;
                return outcome;
            }
        };

        if let Some(missing) = job.depends_on.iter().find(|s| !workflow.is_completed(**s)) {
            let reason = format!("stage {} not completed today", missing);
            info!("Skipping job {}: {}", job.id, reason);
            return self
                .finish(job, JobStatus::Skipped, 0, started_at, Some(reason))
                .await;
        }
        if let Some(stage) = job.stage {
            if workflow.is_completed(stage) && !force {
                let reason = format!("stage {} already completed today", stage);
                info!("Skipping job {}: {}", job.id, reason);
                return self
                    .finish(job, JobStatus::Skipped, 0, started_at, Some(reason))
                    .await;
            }
        }

        let max_attempts = if job.retry_on_failure { 2 } else { 1 };
        let mut last_status = JobStatus::Failed;
        let mut last_message = String::new();

        for attempt in 1..=max_attempts {
            info!("Running job {} (attempt {}/{})", job.id, attempt, max_attempts);

            match tokio::time::timeout(job.timeout(), self.dispatch(job)).await {
                Ok(Ok(message)) => {
                    if let Some(stage) = job.stage {
                        if let Err(e) = self.complete_stage(stage).await {
                            error!("Job {} succeeded but stage {} was not saved: {}", job.id, stage, e);
                        }
                    }
                    return self
                        .finish(job, JobStatus::Success, attempt, started_at, Some(message))
                        .await;
                }
                Ok(Err(e)) => {
                    let message = e.to_string();
                    warn!("Job {} failed on attempt {}: {}", job.id, attempt, message);
                    self.ctx
                        .recovery
                        .report(&job.id, &message, e.severity())
                        .await;
                    last_status = JobStatus::Failed;
                    last_message = message;
                }
                Err(_) => {
                    let message = format!("job {} timed out after {}s", job.id, job.timeout_secs);
                    warn!("{}; the action may still be running", message);
                    self.ctx
                        .recovery
                        .report(&job.id, &message, Severity::High)
                        .await;
                    last_status = JobStatus::TimedOut;
                    last_message = message;
                }
            }
        }

        // A retried job ends FAILED whatever the last attempt did
        let status = if max_attempts > 1 {
            JobStatus::Failed
        } else {
            last_status
        };

        notify_quietly(
            self.collaborators.notifier.as_ref(),
            Severity::High,
            &format!("Job {} {}: {}", job.id, status, last_message),
            &json!({ "job": job.id, "status": status, "attempts": max_attempts }),
        )
        .await;

        self.finish(job, status, max_attempts, started_at, Some(last_message))
            .await
    }

    async fn finish(
        &self,
        job: &JobDefinition,
        status: JobStatus,
        attempts: u32,
        started_at: DateTime<Utc>,
        message: Option<String>,
    ) -> JobOutcome {
        let outcome = JobOutcome {
            job_id: job.id.clone(),
            status,
            attempts,
            started_at,
            finished_at: self.ctx.clock.now(),
            message,
        };
        info!("Job {} finished: {}", job.id, status);
        match status {
            JobStatus::Success => {
                self.report_health(HealthStatus::Healthy, &format!("job {} succeeded", job.id))
                    .await
            }
            JobStatus::Failed | JobStatus::TimedOut => {
                self.report_health(HealthStatus::Degraded, &format!("job {} {}", job.id, status))
                    .await
            }
            JobStatus::Skipped => {}
        }

        let mut history = self.history.write().await;
        history.push_back(outcome.clone());
        while history.len() > self.history_limit {
            history.pop_front();
        }
        outcome
    }

    async fn dispatch(&self, job: &JobDefinition) -> Result<String, AutopilotError> {
        match &job.action {
            JobAction::Shell { target, args } => run_shell(target, args).await,
            JobAction::DelegateController { target, args } => match target {
                ControllerTarget::AdjustParameters => {
                    let lookback = args
                        .get("lookback_days")
                        .and_then(Value::as_u64)
                        .map(|d| d as usize)
                        .unwrap_or(self.ctx.learning.config().lookback_days);
                    let params = self.ctx.learning.adjust_parameters(lookback).await?;
                    Ok(format!("parameters {}", describe(&params)))
                }
                ControllerTarget::EvaluateRetrain => {
                    let state = self.ctx.retrain.evaluate().await?;
                    let trained = self.ensure_training().await?;
                    Ok(match trained {
                        Some(outcome) => format!("retrained model {}", outcome.model_version),
                        None => format!("retrain progress {:.1}%", state.overall_progress),
                    })
                }
                ControllerTarget::DailyReport => self.send_daily_report().await,
            },
            JobAction::DelegateCollaborator { target, .. } => {
                let trading = &self.collaborators.trading;
                match target {
                    CollaboratorTarget::Screening => Ok(summarize(trading.run_screening().await?)),
                    CollaboratorTarget::Selection => Ok(summarize(trading.run_selection().await?)),
                    CollaboratorTarget::StartTrading => {
                        Ok(summarize(trading.start_trading().await?))
                    }
                    CollaboratorTarget::StopTrading => Ok(summarize(trading.stop_trading().await?)),
                    CollaboratorTarget::Backtest => self.run_backtest(&job.id).await,
                }
            }
        }
    }

    async fn run_backtest(&self, job_id: &str) -> Result<String, AutopilotError> {
        let params = self.ctx.learning.current_parameters().await?;
        let metrics = self.collaborators.backtest.run_backtest(&params).await?;
        persistence::append(
            self.ctx.store.as_ref(),
            keys::BACKTEST_RESULTS,
            &json!({
                "ran_at": self.ctx.clock.now(),
                "job": job_id,
                "parameters": params,
                "metrics": metrics,
            }),
        )
        .await?;
        Ok(format!(
            "backtest: {} trades, win rate {:.2}, return {}",
            metrics.trades, metrics.win_rate, metrics.total_return
        ))
    }

    /// Finish a latched retrain that has not invoked training yet.
    ///
    /// Moves the workflow to ML_TRAINING, trains, and queues
    /// `retrain_triggered` on success. A failure leaves the trigger
    /// untouched so the next call retries.
    pub async fn ensure_training(&self) -> Result<Option<TrainingOutcome>, AutopilotError> {
        let state = self.ctx.retrain.state().await?;
        if !state.needs_training() {
            return Ok(None);
        }

        let mut workflow = self.workflow().await?;
        workflow.enter(Stage::MlTraining, self.ctx.clock.now());
        self.save_workflow(&workflow).await?;
        info!("Retrain latched at {:?}, starting model training", state.triggered_at);

        let outcome = self
            .ctx
            .retrain
            .invoke_training(self.collaborators.training.as_ref())
            .await?;

        if let Some(trained) = &outcome {
            self.complete_stage(Stage::MlTraining).await?;
            notify_quietly(
                self.collaborators.notifier.as_ref(),
                Severity::Medium,
                &format!("Model retrained: {}", trained.model_version),
                &json!({ "model_version": trained.model_version, "metrics": trained.metrics }),
            )
            .await;
            self.pending_events
                .lock()
                .await
                .push_back(RETRAIN_TRIGGERED_EVENT.to_string());
        }
        Ok(outcome)
    }

    async fn send_daily_report(&self) -> Result<String, AutopilotError> {
        let today = self.today();
        let outcomes: Vec<JobOutcome> = self
            .history
            .read()
            .await
            .iter()
            .filter(|o| o.started_at.with_timezone(&self.offset).date_naive() == today)
            .cloned()
            .collect();
        let retrain = self.ctx.retrain.progress().await?;
        let recovery = self.ctx.recovery.stats().await;

        let report = DailyReport::build(today, &outcomes, &retrain, &recovery);
        let message = report.message();
        notify_quietly(
            self.collaborators.notifier.as_ref(),
            report.severity(),
            &message,
            &serde_json::to_value(&report).unwrap_or_default(),
        )
        .await;
        Ok(message)
    }

    fn today(&self) -> chrono::NaiveDate {
        self.ctx.clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Workflow state as of now, with yesterday's stages cleared
    pub async fn workflow(&self) -> Result<WorkflowState, StoreError> {
        let mut workflow: WorkflowState =
            persistence::load(self.ctx.store.as_ref(), keys::WORKFLOW_STATE)
                .await?
                .unwrap_or_default();
        if workflow.roll_over(self.ctx.clock.now(), self.offset) {
            debug!("New trading day, completed stages cleared");
        }
        Ok(workflow)
    }

    async fn report_health(&self, status: HealthStatus, message: &str) {
        if let Some(checker) = &self.health {
            checker
                .register_component(SCHEDULER_COMPONENT, status, message)
                .await;
        }
    }

    async fn save_workflow(&self, workflow: &WorkflowState) -> Result<(), StoreError> {
        persistence::save(self.ctx.store.as_ref(), keys::WORKFLOW_STATE, workflow).await
    }

    async fn complete_stage(&self, stage: Stage) -> Result<(), StoreError> {
        let mut workflow = self.workflow().await?;
        workflow.complete(stage, self.ctx.clock.now());
        self.save_workflow(&workflow).await
    }

    /// Compute the next firing of every enabled timed job after `now`
    pub async fn arm(&self, now: DateTime<Utc>) {
        let mut next_runs = self.next_runs.write().await;
        next_runs.clear();
        for job in self.jobs.iter().filter(|j| j.enabled) {
            if let Some(at) = job.trigger.next_fire_after(now, self.offset) {
                next_runs.insert(job.id.clone(), at);
            }
        }
    }

    /// Run every job due at `now` in declaration order.
    ///
    /// A job that missed several firings runs once.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<JobOutcome> {
        let due: Vec<&JobDefinition> = {
            let next_runs = self.next_runs.read().await;
            self.jobs
                .iter()
                .filter(|j| next_runs.get(&j.id).map_or(false, |at| *at <= now))
                .collect()
        };

        let mut outcomes = Vec::new();
        for job in due {
            {
                let mut next_runs = self.next_runs.write().await;
                match job.trigger.next_fire_after(now, self.offset) {
                    Some(at) => next_runs.insert(job.id.clone(), at),
                    None => next_runs.remove(&job.id),
                };
            }
            outcomes.push(self.execute(job, false).await);
            outcomes.extend(self.drain_events().await);
        }
        outcomes
    }

    async fn sleep_for(&self, now: DateTime<Utc>) -> Duration {
        self.next_runs
            .read()
            .await
            .values()
            .min()
            .map(|at| (*at - now).to_std().unwrap_or(Duration::ZERO))
            .unwrap_or(self.poll_interval)
            .min(self.poll_interval)
    }

    /// Drive timed jobs until `stop` is called
    pub async fn run_forever(&self) {
        *self.running.write().await = true;
        info!(
            "Scheduler started with {} jobs (UTC offset {})",
            self.jobs.len(),
            self.offset
        );

        if let Err(e) = self.ensure_training().await {
            error!("Pending model training failed at startup: {}", e);
            self.ctx
                .recovery
                .report("scheduler", &format!("pending training failed: {}", e), e.severity())
                .await;
        }
        self.drain_events().await;
        self.arm(self.ctx.clock.now()).await;

        while *self.running.read().await {
            let now = self.ctx.clock.now();
            self.tick(now).await;
            let wait = self.sleep_for(self.ctx.clock.now()).await;
            tokio::time::sleep(wait).await;
        }
        info!("Scheduler stopped");
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Workflow, retrain progress, recovery statistics and recent jobs
    pub async fn status(&self) -> Result<StatusReport, AutopilotError> {
        Ok(StatusReport {
            generated_at: self.ctx.clock.now(),
            workflow: self.workflow().await?,
            retrain: self.ctx.retrain.progress().await?,
            recovery: self.ctx.recovery.stats().await,
            recent_jobs: self.history.read().await.iter().cloned().collect(),
            next_runs: self
                .next_runs
                .read()
                .await
                .iter()
                .map(|(id, at)| (id.clone(), *at))
                .collect::<BTreeMap<_, _>>(),
        })
    }
}

async fn run_shell(program: &str, args: &[String]) -> Result<String, AutopilotError> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AutopilotError::Shell(format!("{}: {}", program, e)))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(AutopilotError::Shell(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

fn summarize(report: CollaboratorReport) -> String {
    report.message.unwrap_or_else(|| "ok".to_string())
}

fn describe(params: &StrategyParameters) -> String {
    params
        .values
        .iter()
        .map(|(name, bound)| format!("{}={:.4}", name, bound.value))
        .collect::<Vec<_>>()
        .join(" ")
}
