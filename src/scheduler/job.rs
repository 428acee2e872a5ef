use crate::core::Stage;
use crate::error::ConfigError;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// When a job fires.
///
/// Written as `daily HH:MM`, `weekdays HH:MM`, `weekly <weekday> HH:MM`,
/// `monthly <day> HH:MM` or `event <name>`. Times are local to the
/// scheduler's UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JobTrigger {
    Daily(NaiveTime),
    /// Monday to Friday
    Weekdays(NaiveTime),
    Weekly(Weekday, NaiveTime),
    /// Days past the end of a month fire on its last day
    Monthly(u32, NaiveTime),
    Event(String),
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("invalid time '{}': {}", s, e))
}

fn last_day_of_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

impl JobTrigger {
    pub fn is_event(&self, name: &str) -> bool {
        matches!(self, JobTrigger::Event(e) if e == name)
    }

    fn time(&self) -> Option<NaiveTime> {
        match self {
            JobTrigger::Daily(t)
            | JobTrigger::Weekdays(t)
            | JobTrigger::Weekly(_, t)
            | JobTrigger::Monthly(_, t) => Some(*t),
            JobTrigger::Event(_) => None,
        }
    }

    fn fires_on(&self, date: NaiveDate) -> bool {
        match self {
            JobTrigger::Daily(_) => true,
            JobTrigger::Weekdays(_) => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            JobTrigger::Weekly(day, _) => date.weekday() == *day,
            JobTrigger::Monthly(day, _) => date.day() == (*day).min(last_day_of_month(date)),
            JobTrigger::Event(_) => false,
        }
    }

    /// First firing strictly after `after`. Event triggers never fire on
    /// their own.
    pub fn next_fire_after(
        &self,
        after: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Option<DateTime<Utc>> {
        let time = self.time()?;
        let start = after.with_timezone(&offset).date_naive();

        // Two months covers every monthly day
        (0..=62).find_map(|delta| {
            let date = start + Duration::days(delta);
            if !self.fires_on(date) {
                return None;
            }
            let local = offset.from_local_datetime(&date.and_time(time)).single()?;
            let fire = local.with_timezone(&Utc);
            (fire > after).then_some(fire)
        })
    }
}

impl FromStr for JobTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            ["daily", time] => Ok(JobTrigger::Daily(parse_time(time)?)),
            ["weekdays", time] => Ok(JobTrigger::Weekdays(parse_time(time)?)),
            ["weekly", day, time] => {
                let day = day
                    .parse::<Weekday>()
                    .map_err(|_| format!("invalid weekday '{}'", day))?;
                Ok(JobTrigger::Weekly(day, parse_time(time)?))
            }
            ["monthly", day, time] => {
                let day: u32 = day
                    .parse()
                    .ok()
                    .filter(|d| (1..=31).contains(d))
                    .ok_or_else(|| format!("invalid day of month '{}'", day))?;
                Ok(JobTrigger::Monthly(day, parse_time(time)?))
            }
            ["event", name] => Ok(JobTrigger::Event(name.to_string())),
            _ => Err(format!("unrecognised trigger '{}'", s)),
        }
    }
}

impl TryFrom<String> for JobTrigger {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for JobTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobTrigger::Daily(t) => write!(f, "daily {}", t.format("%H:%M")),
            JobTrigger::Weekdays(t) => write!(f, "weekdays {}", t.format("%H:%M")),
            JobTrigger::Weekly(d, t) => write!(f, "weekly {} {}", d, t.format("%H:%M")),
            JobTrigger::Monthly(d, t) => write!(f, "monthly {} {}", d, t.format("%H:%M")),
            JobTrigger::Event(name) => write!(f, "event {}", name),
        }
    }
}

impl From<JobTrigger> for String {
    fn from(trigger: JobTrigger) -> Self {
        trigger.to_string()
    }
}

/// Operations the scheduler runs itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerTarget {
    AdjustParameters,
    EvaluateRetrain,
    DailyReport,
}

/// Operations delegated to external collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorTarget {
    Screening,
    Selection,
    StartTrading,
    StopTrading,
    Backtest,
}

/// What a job does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobAction {
    Shell {
        target: String,
        #[serde(default)]
        args: Vec<String>,
    },
    DelegateController {
        target: ControllerTarget,
        #[serde(default)]
        args: Value,
    },
    DelegateCollaborator {
        target: CollaboratorTarget,
        #[serde(default)]
        args: Value,
    },
}

fn default_enabled() -> bool {
    true
}

/// A scheduled job, immutable once registered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    pub trigger: JobTrigger,
    pub action: JobAction,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub timeout_secs: u64,
    /// Retry once after a failure or timeout
    #[serde(default)]
    pub retry_on_failure: bool,
    /// Workflow stage completed by this job
    #[serde(default)]
    pub stage: Option<Stage>,
    /// Stages that must be completed today before this job runs
    #[serde(default)]
    pub depends_on: Vec<Stage>,
}

impl JobDefinition {
    pub fn new(id: &str, trigger: JobTrigger, action: JobAction, timeout_secs: u64) -> Self {
        Self {
            id: id.to_string(),
            trigger,
            action,
            enabled: true,
            timeout_secs,
            retry_on_failure: false,
            stage: None,
            depends_on: Vec::new(),
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn depending_on(mut self, stage: Stage) -> Self {
        self.depends_on.push(stage);
        self
    }

    pub fn with_retry(mut self) -> Self {
        self.retry_on_failure = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidJob {
            job: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout must be positive"));
        }
        if let JobAction::Shell { target, .. } = &self.action {
            if target.trim().is_empty() {
                return Err(invalid("shell action without a command"));
            }
        }
        if let Some(stage) = self.stage {
            if self.depends_on.contains(&stage) {
                return Err(invalid("job depends on its own stage"));
            }
        }
        Ok(())
    }
}

/// Final status of one job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Success,
    Skipped,
    Failed,
    TimedOut,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Success => "SUCCESS",
            JobStatus::Skipped => "SKIPPED",
            JobStatus::Failed => "FAILED",
            JobStatus::TimedOut => "TIMED_OUT",
        };
        f.write_str(s)
    }
}

/// Record of one job run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub message: Option<String>,
}
