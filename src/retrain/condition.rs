use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Readiness conditions for a retraining pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    TradingDays,
    SelectionRecords,
    PerformanceRecords,
    WinRate,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 4] = [
        ConditionKind::TradingDays,
        ConditionKind::SelectionRecords,
        ConditionKind::PerformanceRecords,
        ConditionKind::WinRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::TradingDays => "trading_days",
            ConditionKind::SelectionRecords => "selection_records",
            ConditionKind::PerformanceRecords => "performance_records",
            ConditionKind::WinRate => "win_rate",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Required value and weight of one condition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionThreshold {
    pub required: f64,
    pub weight: f64,
}

/// Retrain trigger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrainConfig {
    pub conditions: BTreeMap<ConditionKind, ConditionThreshold>,
    /// Trailing window used for the daily accrual rate
    pub rate_window_days: i64,
    pub max_snapshots: usize,
}

impl Default for RetrainConfig {
    fn default() -> Self {
        let conditions = [
            (ConditionKind::TradingDays, 60.0, 0.25),
            (ConditionKind::SelectionRecords, 50.0, 0.25),
            (ConditionKind::PerformanceRecords, 30.0, 0.30),
            (ConditionKind::WinRate, 0.45, 0.20),
        ]
        .into_iter()
        .map(|(kind, required, weight)| (kind, ConditionThreshold { required, weight }))
        .collect();

        Self {
            conditions,
            rate_window_days: 30,
            max_snapshots: 400,
        }
    }
}

impl RetrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut total = 0.0;
        for (kind, threshold) in &self.conditions {
            if !(threshold.required > 0.0 && threshold.required.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    key: format!("retrain.conditions.{}.required", kind),
                    value: threshold.required.to_string(),
                });
            }
            if !(threshold.weight >= 0.0 && threshold.weight.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    key: format!("retrain.conditions.{}.weight", kind),
                    value: threshold.weight.to_string(),
                });
            }
            total += threshold.weight;
        }
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightSum(total));
        }
        if self.rate_window_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "retrain.rate_window_days".to_string(),
                value: self.rate_window_days.to_string(),
            });
        }
        Ok(())
    }
}

/// One condition evaluated against its threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub kind: ConditionKind,
    pub current_value: f64,
    pub required_threshold: f64,
    pub weight: f64,
}

impl TriggerCondition {
    /// Percent of the threshold reached, capped at 100
    pub fn progress(&self) -> f64 {
        if self.required_threshold <= 0.0 {
            return 100.0;
        }
        (100.0 * self.current_value / self.required_threshold).clamp(0.0, 100.0)
    }

    pub fn is_complete(&self) -> bool {
        self.current_value >= self.required_threshold
    }
}

/// Weighted mean of per-condition progress. Exactly 100 once every
/// condition is complete.
pub fn overall_progress(conditions: &[TriggerCondition]) -> f64 {
    if !conditions.is_empty() && conditions.iter().all(TriggerCondition::is_complete) {
        return 100.0;
    }
    conditions
        .iter()
        .map(|c| c.weight * c.progress())
        .sum::<f64>()
        .min(100.0)
}
