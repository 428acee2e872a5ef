//! Multi-condition readiness latch for model retraining.

pub mod condition;
pub mod state;
pub mod trigger;

pub use condition::{
    overall_progress, ConditionKind, ConditionThreshold, RetrainConfig, TriggerCondition,
};
pub use state::{TriggerSnapshot, TriggerState};
pub use trigger::{estimate_days_remaining, AutoRetrainTrigger, RetrainProgress, TriggerInputs};
