pub mod record;
/// Trading performance history
pub mod store;

pub use record::{sharpe_ratio, DataQualityIssue, PerformanceRecord, SelectionRecord};
pub use store::{PerformanceStore, PerformanceSummary};
