use super::job::{JobOutcome, JobStatus};
use super::workflow::WorkflowState;
use crate::core::Severity;
use crate::recovery::RecoveryStats;
use crate::retrain::RetrainProgress;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operator-facing snapshot of the autopilot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Utc>,
    pub workflow: WorkflowState,
    pub retrain: RetrainProgress,
    pub recovery: RecoveryStats,
    pub recent_jobs: Vec<JobOutcome>,
    pub next_runs: BTreeMap<String, DateTime<Utc>>,
}

/// End-of-day summary sent to the notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub succeeded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub timed_out: Vec<String>,
    pub retrain_progress: f64,
    pub estimated_days_remaining: Option<u64>,
    pub retrain_triggered: bool,
    pub exhausted_recoveries: usize,
}

impl DailyReport {
    pub fn build(
        date: NaiveDate,
        outcomes: &[JobOutcome],
        retrain: &RetrainProgress,
        recovery: &RecoveryStats,
    ) -> Self {
        let ids = |status: JobStatus| -> Vec<String> {
            outcomes
                .iter()
                .filter(|o| o.status == status)
                .map(|o| o.job_id.clone())
                .collect()
        };

        Self {
            date,
            succeeded: ids(JobStatus::Success),
            skipped: ids(JobStatus::Skipped),
            failed: ids(JobStatus::Failed),
            timed_out: ids(JobStatus::TimedOut),
            retrain_progress: retrain.overall_progress,
            estimated_days_remaining: retrain.estimated_days_remaining,
            retrain_triggered: retrain.triggered,
            exhausted_recoveries: recovery.exhausted,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.timed_out.is_empty() || self.exhausted_recoveries > 0
    }

    pub fn severity(&self) -> Severity {
        if self.has_failures() {
            Severity::High
        } else {
            Severity::Low
        }
    }

    pub fn message(&self) -> String {
        let list = |ids: &[String]| {
            if ids.is_empty() {
                "none".to_string()
            } else {
                ids.join(", ")
            }
        };
        let estimate = match (self.retrain_triggered, self.estimated_days_remaining) {
            (true, _) => "triggered".to_string(),
            (false, Some(days)) => format!("~{} days remaining", days),
            (false, None) => "no estimate".to_string(),
        };

        format!(
            "Daily report {}: {} succeeded; skipped: {}; failed: {}; timed out: {}; retrain {:.1}% ({}); {} exhausted recoveries in 24h",
            self.date,
            self.succeeded.len(),
            list(&self.skipped),
            list(&self.failed),
            list(&self.timed_out),
            self.retrain_progress,
            estimate,
            self.exhausted_recoveries
        )
    }
}
