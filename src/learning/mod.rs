/// Adaptive strategy parameter tuning
pub mod controller;
pub mod parameters;

pub use controller::{
    apply_band, window_win_rate, AdaptiveLearningController, AdjustmentBand, BandFactors,
    LearningConfig, ParameterSpec,
};
pub use parameters::{BoundedValue, StrategyParameters, WindowFingerprint};
