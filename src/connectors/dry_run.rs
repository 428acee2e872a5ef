use crate::error::CollaboratorError;
use crate::learning::StrategyParameters;
use crate::performance::PerformanceRecord;
use crate::traits::{
    BacktestCollaborator, BacktestMetrics, CollaboratorReport, TradingCollaborator,
    TrainingCollaborator, TrainingOutcome,
};
use async_trait::async_trait;
use log::info;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Trading collaborator that logs each call without touching a broker
#[derive(Debug, Default)]
pub struct DryRunTradingCollaborator {
    call_counter: Arc<Mutex<u64>>,
}

impl DryRunTradingCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, operation: &str) -> CollaboratorReport {
        let mut counter = self.call_counter.lock().await;
        *counter += 1;
        info!("[dry-run] {} (call #{})", operation, *counter);
        CollaboratorReport::with_message(format!("dry-run {}", operation))
    }

    pub async fn calls(&self) -> u64 {
        *self.call_counter.lock().await
    }
}

#[async_trait]
impl TradingCollaborator for DryRunTradingCollaborator {
    async fn run_screening(&self) -> Result<CollaboratorReport, CollaboratorError> {
        Ok(self.record("screening").await)
    }

    async fn run_selection(&self) -> Result<CollaboratorReport, CollaboratorError> {
        Ok(self.record("selection").await)
    }

    async fn start_trading(&self) -> Result<CollaboratorReport, CollaboratorError> {
        Ok(self.record("start_trading").await)
    }

    async fn stop_trading(&self) -> Result<CollaboratorReport, CollaboratorError> {
        Ok(self.record("stop_trading").await)
    }
}

/// Backtest collaborator returning empty metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunBacktest;

#[async_trait]
impl BacktestCollaborator for DryRunBacktest {
    async fn run_backtest(
        &self,
        params: &StrategyParameters,
    ) -> Result<BacktestMetrics, CollaboratorError> {
        info!("[dry-run] backtest with {} parameters", params.values.len());
        Ok(BacktestMetrics {
            trades: 0,
            win_rate: 0.0,
            total_return: Decimal::ZERO,
            sharpe_ratio: None,
            max_drawdown: None,
        })
    }
}

/// Training collaborator that only numbers model versions
#[derive(Debug, Default)]
pub struct DryRunTrainer {
    runs: Arc<Mutex<u64>>,
}

impl DryRunTrainer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrainingCollaborator for DryRunTrainer {
    async fn train(
        &self,
        history: &[PerformanceRecord],
    ) -> Result<TrainingOutcome, CollaboratorError> {
        let mut runs = self.runs.lock().await;
        *runs += 1;
        info!("[dry-run] training over {} records", history.len());

        let mut metrics = BTreeMap::new();
        metrics.insert("records".to_string(), history.len() as f64);
        Ok(TrainingOutcome {
            model_version: format!("dry-run-{}", *runs),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_collaborators_succeed() {
        let trading = DryRunTradingCollaborator::new();
        assert!(trading.run_screening().await.is_ok());
        assert!(trading.stop_trading().await.is_ok());
        assert_eq!(trading.calls().await, 2);

        let trainer = DryRunTrainer::new();
        let outcome = trainer.train(&[]).await.unwrap();
        assert_eq!(outcome.model_version, "dry-run-1");

        let metrics = DryRunBacktest
            .run_backtest(&StrategyParameters::new())
            .await
            .unwrap();
        assert_eq!(metrics.trades, 0);
    }
}
