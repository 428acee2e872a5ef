//! Error types shared across the autopilot.

use crate::core::Severity;
use thiserror::Error;

/// Configuration problems. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate job id: {0}")]
    DuplicateJob(String),

    #[error("Invalid job {job}: {reason}")]
    InvalidJob { job: String, reason: String },

    #[error("Duplicate recovery rule id: {0}")]
    DuplicateRule(String),

    #[error("Invalid pattern in rule {rule}: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid recovery rule {rule}: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Invalid parameter bound for {name}: {reason}")]
    InvalidBound { name: String, reason: String },

    #[error("Retrain condition weights sum to {0}, expected 1.0")]
    WeightSum(f64),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error for key {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupted value under key {key}: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("Duplicate record for key {key}: {reason}")]
    Duplicate { key: String, reason: String },
}

/// Failure reported by an external collaborator
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    pub message: String,
    pub severity: Severity,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Medium,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Notification transport failure. Logged locally, never propagated.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Notification rejected with status {0}")]
    Rejected(u16),

    #[error("Notification signing failed: {0}")]
    Signing(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Transport(e.to_string())
    }
}

/// Umbrella error for the autopilot
#[derive(Debug, Error)]
pub enum AutopilotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Shell command failed: {0}")]
    Shell(String),
}

impl AutopilotError {
    /// Severity used when this error is reported to the recovery engine
    pub fn severity(&self) -> Severity {
        match self {
            AutopilotError::Config(_) => Severity::Critical,
            AutopilotError::Store(_) => Severity::High,
            AutopilotError::Collaborator(e) => e.severity,
            AutopilotError::UnknownJob(_) => Severity::Low,
            AutopilotError::Shell(_) => Severity::Medium,
        }
    }
}

pub type Result<T, E = AutopilotError> = std::result::Result<T, E>;
