pub mod notification;
pub mod trading;
pub mod training;

// Re-export all collaborator contracts
pub use notification::{notify_quietly, LogNotifier, Notifier};
pub use trading::{BacktestCollaborator, BacktestMetrics, CollaboratorReport, TradingCollaborator};
pub use training::{TrainingCollaborator, TrainingOutcome};
