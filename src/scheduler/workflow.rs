use crate::core::Stage;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Daily workflow progress. Written only by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub current_stage: Stage,
    pub stages_completed_today: BTreeSet<Stage>,
    pub last_transition_at: Option<DateTime<Utc>>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            current_stage: Stage::Screen,
            stages_completed_today: BTreeSet::new(),
            last_transition_at: None,
        }
    }
}

impl WorkflowState {
    /// Forget yesterday's completed stages. Returns true when a new local
    /// day started.
    pub fn roll_over(&mut self, now: DateTime<Utc>, offset: FixedOffset) -> bool {
        let today = now.with_timezone(&offset).date_naive();
        match self.last_transition_at {
            Some(last) if last.with_timezone(&offset).date_naive() != today => {
                if !self.stages_completed_today.is_empty() {
                    self.stages_completed_today.clear();
                    return true;
                }
                false
            }
            _ => false,
        }
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.stages_completed_today.contains(&stage)
    }

    /// Move to `stage` without completing it
    pub fn enter(&mut self, stage: Stage, now: DateTime<Utc>) {
        self.current_stage = stage;
        self.last_transition_at = Some(now);
    }

    /// Mark `stage` completed today
    pub fn complete(&mut self, stage: Stage, now: DateTime<Utc>) {
        self.current_stage = stage;
        self.stages_completed_today.insert(stage);
        self.last_transition_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rollover_on_new_local_day() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let mut state = WorkflowState::default();
        state.complete(Stage::Screen, Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap());
        state.complete(Stage::Select, Utc.with_ymd_and_hms(2024, 3, 4, 8, 30, 0).unwrap());

        assert!(!state.roll_over(Utc.with_ymd_and_hms(2024, 3, 4, 23, 59, 0).unwrap(), offset));
        assert!(state.is_completed(Stage::Select));

        assert!(state.roll_over(Utc.with_ymd_and_hms(2024, 3, 5, 0, 1, 0).unwrap(), offset));
        assert!(state.stages_completed_today.is_empty());
        assert_eq!(state.current_stage, Stage::Select);
    }

    #[test]
    fn test_rollover_uses_local_date() {
        // 23:30 UTC on the 4th is already the 5th at UTC+01:00
        let offset = FixedOffset::east_opt(3600).unwrap();
        let mut state = WorkflowState::default();
        state.complete(Stage::Screen, Utc.with_ymd_and_hms(2024, 3, 4, 22, 30, 0).unwrap());
        assert!(state.roll_over(Utc.with_ymd_and_hms(2024, 3, 4, 23, 30, 0).unwrap(), offset));
    }

    #[test]
    fn test_serialized_stage_names() {
        let mut state = WorkflowState::default();
        state.enter(Stage::MlTraining, Utc.with_ymd_and_hms(2024, 3, 4, 17, 0, 0).unwrap());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["current_stage"], "ML_TRAINING");
    }
}
