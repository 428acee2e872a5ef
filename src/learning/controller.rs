use super::parameters::{StrategyParameters, WindowFingerprint};
use crate::core::Clock;
use crate::error::{ConfigError, StoreError};
use crate::performance::{PerformanceRecord, PerformanceStore};
use crate::persistence::{self, keys, StateStore};
use chrono::FixedOffset;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Multipliers applied to one parameter outside the neutral zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandFactors {
    /// Applied when the window win rate is below the lower band
    pub below: f64,
    /// Applied when the window win rate is above the upper band
    pub above: f64,
}

/// Declared range and starting value of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

/// Adaptive learning configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Records looked at by the scheduled adjustment
    pub lookback_days: usize,
    /// Fewer records than this leaves the parameters untouched
    pub min_records: usize,
    /// Win rate strictly below this becomes more conservative
    pub lower_band: f64,
    /// Win rate strictly above this becomes more aggressive
    pub upper_band: f64,
    pub factors: BTreeMap<String, BandFactors>,
    pub parameters: BTreeMap<String, ParameterSpec>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        let mut factors = BTreeMap::new();
        factors.insert(
            "risk_tolerance".to_string(),
            BandFactors {
                below: 0.90,
                above: 1.05,
            },
        );
        factors.insert(
            "min_roe_threshold".to_string(),
            BandFactors {
                below: 1.05,
                above: 0.98,
            },
        );

        let mut parameters = BTreeMap::new();
        parameters.insert(
            "risk_tolerance".to_string(),
            ParameterSpec {
                initial: 0.5,
                min: 0.1,
                max: 1.0,
            },
        );
        parameters.insert(
            "min_roe_threshold".to_string(),
            ParameterSpec {
                initial: 0.10,
                min: 0.05,
                max: 0.30,
            },
        );

        Self {
            lookback_days: 5,
            min_records: 3,
            lower_band: 0.50,
            upper_band: 0.70,
            factors,
            parameters,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.lower_band)
            || !(0.0..=1.0).contains(&self.upper_band)
            || self.lower_band > self.upper_band
        {
            return Err(ConfigError::InvalidValue {
                key: "learning.bands".to_string(),
                value: format!("[{}, {}]", self.lower_band, self.upper_band),
            });
        }
        for (name, factors) in &self.factors {
            if !self.parameters.contains_key(name) {
                return Err(ConfigError::InvalidBound {
                    name: name.clone(),
                    reason: "factor declared for an undeclared parameter".to_string(),
                });
            }
            if !(factors.below > 0.0 && factors.above > 0.0) {
                return Err(ConfigError::InvalidBound {
                    name: name.clone(),
                    reason: "factors must be positive".to_string(),
                });
            }
        }
        self.initial_parameters().map(|_| ())
    }

    /// Parameters as declared, before any adjustment
    pub fn initial_parameters(&self) -> Result<StrategyParameters, ConfigError> {
        let mut params = StrategyParameters::new();
        for (name, spec) in &self.parameters {
            params.declare(name, spec.initial, spec.min, spec.max)?;
        }
        Ok(params)
    }
}

/// Direction of an adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentBand {
    Conservative,
    Neutral,
    Aggressive,
}

impl AdjustmentBand {
    /// Open-interval classification: a win rate exactly on a band edge is
    /// neutral.
    pub fn classify(win_rate: f64, lower: f64, upper: f64) -> Self {
        if win_rate < lower {
            AdjustmentBand::Conservative
        } else if win_rate > upper {
            AdjustmentBand::Aggressive
        } else {
            AdjustmentBand::Neutral
        }
    }
}

/// Aggregate win rate across a window. Malformed records contribute no wins.
pub fn window_win_rate(records: &[PerformanceRecord]) -> f64 {
    let trades: u64 = records.iter().map(|r| r.num_trades_closed as u64).sum();
    if trades == 0 {
        return 0.0;
    }
    let wins: u64 = records.iter().map(|r| r.trusted_wins() as u64).sum();
    wins as f64 / trades as f64
}

/// Apply one band's factors. Every resulting value is clamped.
pub fn apply_band(
    params: &StrategyParameters,
    band: AdjustmentBand,
    config: &LearningConfig,
) -> StrategyParameters {
    let mut adjusted = params.clone();
    if band == AdjustmentBand::Neutral {
        return adjusted;
    }

    for (name, factors) in &config.factors {
        let factor = match band {
            AdjustmentBand::Conservative => factors.below,
            AdjustmentBand::Aggressive => factors.above,
            AdjustmentBand::Neutral => 1.0,
        };
        match adjusted.scale(name, factor) {
            Some((old, new)) => info!("Adjusted {}: {:.4} -> {:.4} ({:?})", name, old, new, band),
            None => warn!("Parameter {} has factors but is not declared", name),
        }
    }
    adjusted
}

/// Adapts strategy parameters from recent trading performance
pub struct AdaptiveLearningController {
    config: LearningConfig,
    performance: Arc<PerformanceStore>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl AdaptiveLearningController {
    pub fn new(
        config: LearningConfig,
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
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Current parameters, falling back to the declared initial values
    pub async fn current_parameters(&self) -> Result<StrategyParameters, StoreError> {
        match persistence::load(self.store.as_ref(), keys::STRATEGY_PARAMETERS).await? {
            Some(params) => Ok(params),
            None => self
                .config
                .initial_parameters()
                .map_err(|e| StoreError::Corrupted {
                    key: keys::STRATEGY_PARAMETERS.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Adjust the parameters from the last `lookback_days` records.
    ///
    /// Too little data, a window already applied, or a second call on the
    /// same local day all return the parameters unchanged.
    pub async fn adjust_parameters(
        &self,
        lookback_days: usize,
    ) -> Result<StrategyParameters, StoreError> {
        let lookback = lookback_days.max(1);
        let params = self.current_parameters().await?;
        let records = self.performance.recent(lookback).await?;

        if records.len() < self.config.min_records || records.is_empty() {
            info!(
                "Skipping parameter adjustment: {} records available, {} required",
                records.len(),
                self.config.min_records
            );
            return Ok(params);
        }

        let today = self.clock.now().with_timezone(&self.offset).date_naive();
        let window = WindowFingerprint {
            first: records[0].date,
            last: records[records.len() - 1].date,
            count: records.len(),
        };

        if params.last_adjusted_on == Some(today) || params.last_window == Some(window) {
            debug!(
                "Parameters already adjusted (day {:?}, window {:?})",
                params.last_adjusted_on, params.last_window
            );
            return Ok(params);
        }

        let win_rate = window_win_rate(&records);
        let band = AdjustmentBand::classify(win_rate, self.config.lower_band, self.config.upper_band);
        info!(
            "Window win rate {:.3} over {} records -> {:?}",
            win_rate,
            records.len(),
            band
        );

        let mut adjusted = apply_band(&params, band, &self.config);
        adjusted.last_adjusted_on = Some(today);
        adjusted.last_window = Some(window);

        persistence::save(self.store.as_ref(), keys::STRATEGY_PARAMETERS, &adjusted).await?;
        Ok(adjusted)
    }
}
