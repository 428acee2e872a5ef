use super::condition::{ConditionKind, TriggerCondition};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition values observed on one local date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSnapshot {
    pub date: NaiveDate,
    pub values: BTreeMap<ConditionKind, f64>,
    pub overall_progress: f64,
}

/// Persisted retrain trigger state.
///
/// `triggered` is a one-way latch. `training_invoked` is committed only
/// after the training collaborator returned, so a restart between the two
/// is detected by `needs_training`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerState {
    #[serde(default)]
    pub conditions: Vec<TriggerCondition>,
    #[serde(default)]
    pub snapshots: Vec<TriggerSnapshot>,
    pub overall_progress: f64,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub training_invoked: bool,
    pub training_invoked_at: Option<DateTime<Utc>>,
    pub model_version: Option<String>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl TriggerState {
    pub fn needs_training(&self) -> bool {
        self.triggered && !self.training_invoked
    }

    /// Insert or replace the snapshot for `snapshot.date`, keeping at most
    /// `cap` entries.
    pub fn record_snapshot(&mut self, snapshot: TriggerSnapshot, cap: usize) {
        match self.snapshots.iter_mut().find(|s| s.date == snapshot.date) {
            Some(existing) => *existing = snapshot,
            None => {
                self.snapshots.push(snapshot);
                self.snapshots.sort_by_key(|s| s.date);
            }
        }
        if self.snapshots.len() > cap {
            let excess = self.snapshots.len() - cap;
            self.snapshots.drain(..excess);
        }
    }

    /// Latest snapshot on or before `date`, else the earliest one
    pub fn baseline_for(&self, date: NaiveDate) -> Option<&TriggerSnapshot> {
        self.snapshots
            .iter()
            .rev()
            .find(|s| s.date <= date)
            .or_else(|| self.snapshots.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(day: u32, value: f64) -> TriggerSnapshot {
        let mut values = BTreeMap::new();
        values.insert(ConditionKind::PerformanceRecords, value);
        TriggerSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            values,
            overall_progress: 0.0,
        }
    }

    #[test]
    fn test_same_day_snapshot_replaced() {
        let mut state = TriggerState::default();
        state.record_snapshot(snapshot(1, 1.0), 10);
        state.record_snapshot(snapshot(1, 2.0), 10);
        assert_eq!(state.snapshots.len(), 1);
        assert_eq!(
            state.snapshots[0].values[&ConditionKind::PerformanceRecords],
            2.0
        );
    }

    #[test]
    fn test_snapshot_cap_drops_oldest() {
        let mut state = TriggerState::default();
        for day in 1..=5 {
            state.record_snapshot(snapshot(day, day as f64), 3);
        }
        let days: Vec<u32> = state
            .snapshots
            .iter()
            .map(|s| chrono::Datelike::day(&s.date))
            .collect();
        assert_eq!(days, vec![3, 4, 5]);
    }

    #[test]
    fn test_baseline_falls_back_to_earliest() {
        let mut state = TriggerState::default();
        state.record_snapshot(snapshot(10, 1.0), 10);
        state.record_snapshot(snapshot(20, 5.0), 10);

        let early = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(state.baseline_for(early).map(|s| s.date.to_string()), Some("2024-05-10".to_string()));

        let mid = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert_eq!(state.baseline_for(mid).map(|s| s.date.to_string()), Some("2024-05-10".to_string()));
    }

    #[test]
    fn test_needs_training() {
        let mut state = TriggerState::default();
        assert!(!state.needs_training());
        state.triggered = true;
        assert!(state.needs_training());
        state.training_invoked = true;
        assert!(!state.needs_training());
    }
}
