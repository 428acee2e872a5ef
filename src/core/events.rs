use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error event identifier
pub type EventId = Uuid;

/// Severity of an error event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(format!("Invalid severity: {}", s)),
        }
    }
}

/// Phase of the daily workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Screen,
    Select,
    Trade,
    Analyze,
    MlTraining,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Screen => write!(f, "SCREEN"),
            Stage::Select => write!(f, "SELECT"),
            Stage::Trade => write!(f, "TRADE"),
            Stage::Analyze => write!(f, "ANALYZE"),
            Stage::MlTraining => write!(f, "ML_TRAINING"),
        }
    }
}

/// A failure reported by a component, either pushed by a failing job or
/// synthesized by the health monitor. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub message: String,
    pub severity: Severity,
    pub matched_rule_id: Option<String>,
}

impl ErrorEvent {
    /// Create a new error event stamped with `timestamp`
    pub fn new(
        component: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            component: component.into(),
            message: message.into(),
            severity,
            matched_rule_id: None,
        }
    }

    /// Copy of this event tagged with the rule that matched it
    pub fn with_rule(&self, rule_id: &str) -> Self {
        Self {
            matched_rule_id: Some(rule_id.to_string()),
            ..self.clone()
        }
    }

    /// Text that recovery rule patterns are tested against
    pub fn match_text(&self) -> String {
        format!("{}: {}", self.component, self.message)
    }
}
