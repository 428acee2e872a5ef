use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A strategy parameter value and its declared range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedValue {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl BoundedValue {
    /// Create a bounded value, rejecting inverted ranges and out-of-range
    /// initial values
    pub fn new(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite() && value.is_finite()) {
            return Err(ConfigError::InvalidBound {
                name: name.to_string(),
                reason: "values must be finite".to_string(),
            });
        }
        if min > max {
            return Err(ConfigError::InvalidBound {
                name: name.to_string(),
                reason: format!("min {} greater than max {}", min, max),
            });
        }
        if value < min || value > max {
            return Err(ConfigError::InvalidBound {
                name: name.to_string(),
                reason: format!("initial value {} outside [{}, {}]", value, min, max),
            });
        }
        Ok(Self { value, min, max })
    }

    pub fn clamp(&self, candidate: f64) -> f64 {
        if candidate.is_nan() {
            return self.value;
        }
        candidate.clamp(self.min, self.max)
    }

    pub fn is_within_bounds(&self) -> bool {
        self.value >= self.min && self.value <= self.max
    }
}

/// Identifies the performance window an adjustment was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFingerprint {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub count: usize,
}

/// Named strategy parameters read by the selection and trading collaborators.
/// Every mutation clamps into the declared range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub values: BTreeMap<String, BoundedValue>,
    pub last_adjusted_on: Option<NaiveDate>,
    pub last_window: Option<WindowFingerprint>,
}

impl StrategyParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter
    pub fn declare(&mut self, name: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
        self.values
            .insert(name.to_string(), BoundedValue::new(name, value, min, max)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).map(|v| v.value)
    }

    pub fn bound(&self, name: &str) -> Option<(f64, f64)> {
        self.values.get(name).map(|v| (v.min, v.max))
    }

    /// Set a value, clamped into its range. Returns the stored value, or
    /// `None` when the parameter is not declared.
    pub fn set_clamped(&mut self, name: &str, candidate: f64) -> Option<f64> {
        let entry = self.values.get_mut(name)?;
        entry.value = entry.clamp(candidate);
        Some(entry.value)
    }

    /// Multiply a value by `factor`, clamped into its range. Returns the old
    /// and new values.
    pub fn scale(&mut self, name: &str, factor: f64) -> Option<(f64, f64)> {
        let old = self.get(name)?;
        let new = self.set_clamped(name, old * factor)?;
        Some((old, new))
    }

    /// Copy with every value clamped into its range
    pub fn clamped(&self) -> Self {
        let mut copy = self.clone();
        for entry in copy.values.values_mut() {
            entry.value = entry.clamp(entry.value);
        }
        copy
    }

    pub fn is_within_bounds(&self) -> bool {
        self.values.values().all(BoundedValue::is_within_bounds)
    }
}
