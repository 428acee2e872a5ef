use crate::error::CollaboratorError;
use crate::learning::StrategyParameters;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a successful collaborator call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorReport {
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl CollaboratorReport {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            data: Value::Null,
        }
    }
}

/// Screening, selection and trading session control
#[async_trait]
pub trait TradingCollaborator: Send + Sync {
    async fn run_screening(&self) -> Result<CollaboratorReport, CollaboratorError>;

    async fn run_selection(&self) -> Result<CollaboratorReport, CollaboratorError>;

    async fn start_trading(&self) -> Result<CollaboratorReport, CollaboratorError>;

    async fn stop_trading(&self) -> Result<CollaboratorReport, CollaboratorError>;
}

/// Metrics produced by a backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub trades: u32,
    pub win_rate: f64,
    pub total_return: Decimal,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
}

/// Strategy backtesting
#[async_trait]
pub trait BacktestCollaborator: Send + Sync {
    async fn run_backtest(
        &self,
        params: &StrategyParameters,
    ) -> Result<BacktestMetrics, CollaboratorError>;
}
