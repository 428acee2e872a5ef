use crate::core::{ErrorEvent, Severity};
use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Remedies the engine knows how to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    ResetConnection,
    RestartService,
    ClearCache,
    ReconnectDatabase,
    FreeMemory,
    PauseTrading,
}

impl RecoveryAction {
    pub const ALL: [RecoveryAction; 6] = [
        RecoveryAction::ResetConnection,
        RecoveryAction::RestartService,
        RecoveryAction::ClearCache,
        RecoveryAction::ReconnectDatabase,
        RecoveryAction::FreeMemory,
        RecoveryAction::PauseTrading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::ResetConnection => "reset_connection",
            RecoveryAction::RestartService => "restart_service",
            RecoveryAction::ClearCache => "clear_cache",
            RecoveryAction::ReconnectDatabase => "reconnect_database",
            RecoveryAction::FreeMemory => "free_memory",
            RecoveryAction::PauseTrading => "pause_trading",
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PatternSpec {
    /// Case-insensitive substring
    Contains(String),
    Regex(String),
}

/// Recovery rule as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRuleSpec {
    pub id: String,
    pub pattern: PatternSpec,
    pub severity_threshold: Severity,
    pub action_chain: Vec<RecoveryAction>,
    pub max_attempts: u32,
    pub cooldown_secs: u64,
}

/// Compiled pattern, matched against `"<component>: <message>"`
#[derive(Debug, Clone)]
pub enum RulePattern {
    Contains(String),
    Regex(Regex),
}

impl RulePattern {
    pub fn compile(rule_id: &str, spec: &PatternSpec) -> Result<Self, ConfigError> {
        match spec {
            PatternSpec::Contains(needle) => {
                if needle.is_empty() {
                    return Err(ConfigError::InvalidRule {
                        rule: rule_id.to_string(),
                        reason: "empty pattern".to_string(),
                    });
                }
                Ok(RulePattern::Contains(needle.to_lowercase()))
            }
            PatternSpec::Regex(source) => RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map(RulePattern::Regex)
                .map_err(|source| ConfigError::InvalidPattern {
                    rule: rule_id.to_string(),
                    source,
                }),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            RulePattern::Contains(needle) => text.to_lowercase().contains(needle.as_str()),
            RulePattern::Regex(re) => re.is_match(text),
        }
    }
}

/// Immutable, compiled recovery rule
#[derive(Debug, Clone)]
pub struct RecoveryRule {
    pub id: String,
    pub pattern: RulePattern,
    pub severity_threshold: Severity,
    pub action_chain: SmallVec<[RecoveryAction; 4]>,
    /// Total action invocations allowed across passes over the chain
    pub max_attempts: u32,
    pub cooldown: Duration,
}

impl RecoveryRule {
    pub fn compile(spec: &RecoveryRuleSpec) -> Result<Self, ConfigError> {
        if spec.action_chain.is_empty() {
            return Err(ConfigError::InvalidRule {
                rule: spec.id.clone(),
                reason: "action chain is empty".to_string(),
            });
        }
        if spec.max_attempts == 0 {
            return Err(ConfigError::InvalidRule {
                rule: spec.id.clone(),
                reason: "max_attempts must be at least 1".to_string(),
            });
        }

        Ok(Self {
            id: spec.id.clone(),
            pattern: RulePattern::compile(&spec.id, &spec.pattern)?,
            severity_threshold: spec.severity_threshold,
            action_chain: spec.action_chain.iter().copied().collect(),
            max_attempts: spec.max_attempts,
            cooldown: Duration::from_secs(spec.cooldown_secs),
        })
    }

    /// Pattern match and severity at or above the threshold
    pub fn applies_to(&self, event: &ErrorEvent) -> bool {
        event.severity >= self.severity_threshold && self.pattern.matches(&event.match_text())
    }
}

/// Rules in declaration order
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<RecoveryRule>,
}

impl RuleTable {
    /// Compile every rule once. Duplicate ids and bad patterns are fatal.
    pub fn compile(specs: &[RecoveryRuleSpec]) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            if !seen.insert(spec.id.as_str()) {
                return Err(ConfigError::DuplicateRule(spec.id.clone()));
            }
            rules.push(RecoveryRule::compile(spec)?);
        }
        Ok(Self { rules })
    }

    /// First rule, in declaration order, that applies to the event
    pub fn select(&self, event: &ErrorEvent) -> Option<&RecoveryRule> {
        self.rules.iter().find(|rule| rule.applies_to(event))
    }

    pub fn get(&self, id: &str) -> Option<&RecoveryRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn rules(&self) -> &[RecoveryRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn rule(
    id: &str,
    pattern: PatternSpec,
    severity_threshold: Severity,
    action_chain: &[RecoveryAction],
    max_attempts: u32,
    cooldown_secs: u64,
) -> RecoveryRuleSpec {
    RecoveryRuleSpec {
        id: id.to_string(),
        pattern,
        severity_threshold,
        action_chain: action_chain.to_vec(),
        max_attempts,
        cooldown_secs,
    }
}

/// Standard rule table
pub fn default_rules() -> Vec<RecoveryRuleSpec> {
    use RecoveryAction::*;

    vec![
        rule(
            "api_timeout",
            PatternSpec::Regex(r"\b(api|request|http)\b.*\b(timeout|timed out)\b".to_string()),
            Severity::Medium,
            &[ResetConnection, RestartService],
            3,
            300,
        ),
        rule(
            "database_failure",
            PatternSpec::Regex(r"\b(database|db|sqlite|postgres|storage|state store)\b".to_string()),
            Severity::Medium,
            &[ReconnectDatabase, RestartService],
            3,
            300,
        ),
        rule(
            "memory_pressure",
            PatternSpec::Regex(r"\b(memory|oom|out of memory)\b".to_string()),
            Severity::High,
            &[ClearCache, FreeMemory, RestartService],
            3,
            600,
        ),
        rule(
            "resource_exhaustion",
            PatternSpec::Regex(r"\b(cpu load|disk usage|resource exhaustion)\b".to_string()),
            Severity::High,
            &[ClearCache, PauseTrading],
            2,
            900,
        ),
        rule(
            "connection_lost",
            PatternSpec::Contains("connection".to_string()),
            Severity::Low,
            &[ResetConnection],
            2,
            120,
        ),
    ]
}
