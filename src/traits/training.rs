use crate::error::CollaboratorError;
use crate::performance::PerformanceRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model produced by a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub model_version: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

/// ML model training over the full performance history
#[async_trait]
pub trait TrainingCollaborator: Send + Sync {
    async fn train(
        &self,
        history: &[PerformanceRecord],
    ) -> Result<TrainingOutcome, CollaboratorError>;
}
