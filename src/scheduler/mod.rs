//! Time and event driven job scheduling over the daily trading workflow.

pub mod job;
pub mod report;
#[allow(clippy::module_inception)]
pub mod scheduler;
pub mod workflow;

pub use job::{
    CollaboratorTarget, ControllerTarget, JobAction, JobDefinition, JobOutcome, JobStatus,
    JobTrigger,
};
pub use report::{DailyReport, StatusReport};
pub use scheduler::{
    default_jobs, parse_utc_offset, Collaborators, JobScheduler, SchedulerConfig,
    SchedulerContext, RETRAIN_TRIGGERED_EVENT, SCHEDULER_COMPONENT,
};
pub use workflow::WorkflowState;
