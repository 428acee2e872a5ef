pub mod dry_run;
pub mod mock;
pub mod webhook;

pub use dry_run::{DryRunBacktest, DryRunTradingCollaborator, DryRunTrainer};
pub use mock::{
    RecordingNotifier, ScriptedActionHandler, ScriptedStep, ScriptedTradingCollaborator,
    ScriptedTrainer, SentNotification,
};
pub use webhook::{WebhookNotifier, SIGNATURE_HEADER};
