//! Rule-driven error recovery with bounded retries and per-component
//! cooldowns.

pub mod actions;
pub mod engine;
pub mod rules;

pub use actions::{ActionHandler, ActionRegistry, ActionResult, LoggingActionHandler};
pub use engine::{
    AttemptOutcome, ErrorRecoveryEngine, RecoveryAttempt, RecoveryConfig, RecoveryPhase,
    RecoveryReport, RecoveryStats, RetryConfig,
};
pub use rules::{
    default_rules, PatternSpec, RecoveryAction, RecoveryRule, RecoveryRuleSpec, RulePattern,
    RuleTable,
};
