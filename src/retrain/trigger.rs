use super::condition::{overall_progress, ConditionKind, RetrainConfig, TriggerCondition};
use super::state::{TriggerSnapshot, TriggerState};
use crate::core::Clock;
use crate::error::{AutopilotError, StoreError};
use crate::performance::{PerformanceStore, PerformanceSummary};
use crate::persistence::{self, keys, StateStore};
use crate::traits::{TrainingCollaborator, TrainingOutcome};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Current values of every readiness condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerInputs {
    pub trading_days: f64,
    pub selection_records: f64,
    pub performance_records: f64,
    pub win_rate: f64,
}

impl TriggerInputs {
    pub fn value(&self, kind: ConditionKind) -> f64 {
        match kind {
            ConditionKind::TradingDays => self.trading_days,
            ConditionKind::SelectionRecords => self.selection_records,
            ConditionKind::PerformanceRecords => self.performance_records,
            ConditionKind::WinRate => self.win_rate,
        }
    }
}

impl From<&PerformanceSummary> for TriggerInputs {
    fn from(summary: &PerformanceSummary) -> Self {
        Self {
            trading_days: summary.trading_days as f64,
            selection_records: summary.selection_records as f64,
            performance_records: summary.performance_records as f64,
            win_rate: summary.win_rate,
        }
    }
}

/// Retrain readiness as reported to operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainProgress {
    pub per_condition: BTreeMap<ConditionKind, f64>,
    pub overall_progress: f64,
    pub bottleneck: Option<ConditionKind>,
    pub estimated_days_remaining: Option<u64>,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub training_invoked: bool,
    pub model_version: Option<String>,
}

/// Extrapolate days until the slowest weighted condition completes.
///
/// Trading days accrue one per calendar day; every other condition accrues
/// at its observed change over the trailing window divided by the window
/// length. Returns `Some(0)` when everything is complete and `None` when no
/// positive rate is known.
pub fn estimate_days_remaining(
    conditions: &[TriggerCondition],
    state: &TriggerState,
    today: NaiveDate,
    window_days: i64,
) -> (Option<ConditionKind>, Option<u64>) {
    if conditions.iter().all(TriggerCondition::is_complete) {
        return (None, Some(0));
    }

    let bottleneck = conditions
        .iter()
        .filter(|c| c.weight > 0.0 && c.progress() < 100.0)
        .min_by(|a, b| a.progress().total_cmp(&b.progress()));

    let bottleneck = match bottleneck {
        Some(c) => c,
        None => return (None, None),
    };

    let rate = match bottleneck.kind {
        ConditionKind::TradingDays => 1.0,
        kind => {
            let window = window_days.max(1);
            let baseline = match state.baseline_for(today - Duration::days(window)) {
                Some(snapshot) => snapshot.values.get(&kind).copied().unwrap_or(0.0),
                None => return (Some(kind), None),
            };
            (bottleneck.current_value - baseline) / window as f64
        }
    };

    if rate.is_nan() || rate <= 0.0 {
        return (Some(bottleneck.kind), None);
    }

    let remaining = (bottleneck.required_threshold - bottleneck.current_value).max(0.0);
    (Some(bottleneck.kind), Some((remaining / rate).ceil() as u64))
}

/// Decides when enough history exists for a retraining pass
pub struct AutoRetrainTrigger {
    config: RetrainConfig,
    performance: Arc<PerformanceStore>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    state_lock: Mutex<()>,
}

impl AutoRetrainTrigger {
    pub fn new(
        config: RetrainConfig,
        performance: Arc<PerformanceStore>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            config,
            performance,
            store,
            clock,
            offset,
            state_lock: Mutex::new(()),
        }
    }

    /// Persisted state, default when nothing was written yet
    pub async fn state(&self) -> Result<TriggerState, StoreError> {
        Ok(persistence::load(self.store.as_ref(), keys::TRIGGER_STATE)
            .await?
            .unwrap_or_default())
    }

    /// Condition values derived from the performance history
    pub async fn inputs(&self) -> Result<TriggerInputs, StoreError> {
        let summary = self.performance.summary().await?;
        Ok(TriggerInputs::from(&summary))
    }

    pub fn conditions_for(&self, inputs: &TriggerInputs) -> Vec<TriggerCondition> {
        self.config
            .conditions
            .iter()
            .map(|(kind, threshold)| TriggerCondition {
                kind: *kind,
                current_value: inputs.value(*kind),
                required_threshold: threshold.required,
                weight: threshold.weight,
            })
            .collect()
    }

    /// Evaluate readiness against the current performance history
    pub async fn evaluate(&self) -> Result<TriggerState, StoreError> {
        let inputs = self.inputs().await?;
        self.evaluate_with(inputs).await
    }

    /// Evaluate readiness against explicit inputs.
    ///
    /// Once the latch is set this is a pure read.
    pub async fn evaluate_with(&self, inputs: TriggerInputs) -> Result<TriggerState, StoreError> {
        let _guard = self.state_lock.lock().await;
        let mut state = self.state().await?;

        if state.triggered {
            debug!("Retrain trigger already latched at {:?}", state.triggered_at);
            return Ok(state);
        }

        let now = self.clock.now();
        let today = now.with_timezone(&self.offset).date_naive();
        let conditions = self.conditions_for(&inputs);
        let overall = overall_progress(&conditions);

        state.record_snapshot(
            TriggerSnapshot {
                date: today,
                values: conditions.iter().map(|c| (c.kind, c.current_value)).collect(),
                overall_progress: overall,
            },
            self.config.max_snapshots,
        );
        state.conditions = conditions;
        state.overall_progress = overall;
        state.last_evaluated_at = Some(now);

        if state.conditions.iter().all(TriggerCondition::is_complete) {
            state.triggered = true;
            state.triggered_at = Some(now);
            info!("Retrain trigger fired: all conditions complete");
        } else {
            debug!("Retrain progress {:.1}%", overall);
        }

        persistence::save(self.store.as_ref(), keys::TRIGGER_STATE, &state).await?;
        Ok(state)
    }

    /// Per-condition and overall progress with a completion estimate.
    /// Reads only.
    pub async fn progress(&self) -> Result<RetrainProgress, StoreError> {
        let state = self.state().await?;
        let conditions = if state.triggered && !state.conditions.is_empty() {
            state.conditions.clone()
        } else {
            self.conditions_for(&self.inputs().await?)
        };

        let today = self.clock.now().with_timezone(&self.offset).date_naive();
        let (bottleneck, estimated_days_remaining) =
            estimate_days_remaining(&conditions, &state, today, self.config.rate_window_days);

        Ok(RetrainProgress {
            per_condition: conditions.iter().map(|c| (c.kind, c.progress())).collect(),
            overall_progress: overall_progress(&conditions),
            bottleneck,
            estimated_days_remaining,
            triggered: state.triggered,
            triggered_at: state.triggered_at,
            training_invoked: state.training_invoked,
            model_version: state.model_version.clone(),
        })
    }

    /// Run training once for a latched trigger.
    ///
    /// `training_invoked` is committed only after the collaborator returns,
    /// so a failure or crash before that point retries on the next call.
    pub async fn invoke_training(
        &self,
        training: &dyn TrainingCollaborator,
    ) -> Result<Option<TrainingOutcome>, AutopilotError> {
        let _guard = self.state_lock.lock().await;
        let mut state = self.state().await?;

        if !state.needs_training() {
            return Ok(None);
        }

        let history = self.performance.records().await?;
        info!("Invoking model training over {} performance records", history.len());
        let outcome = training.train(&history).await?;

        state.training_invoked = true;
        state.training_invoked_at = Some(self.clock.now());
        state.model_version = Some(outcome.model_version.clone());
        persistence::save(self.store.as_ref(), keys::TRIGGER_STATE, &state).await?;

        info!("Training completed: model {}", outcome.model_version);
        Ok(Some(outcome))
    }
}
