use chrono::NaiveDate;
use log::warn;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// One trading day's outcome, written once at end of day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub date: NaiveDate,
    pub num_selections: u32,
    pub num_trades_closed: u32,
    pub num_wins: u32,
    pub num_losses: u32,
    /// num_wins / num_trades_closed, 0 when no trades closed
    pub win_rate: f64,
    /// Total return for the day
    pub total_return: Decimal,
    /// Sharpe ratio over the daily return series, needs two or more records
    pub sharpe_ratio: Option<f64>,
}

/// A problem found in a stored record
#[derive(Debug, Clone, PartialEq)]
pub enum DataQualityIssue {
    /// win_rate recorded although no trade closed
    WinRateWithoutTrades { win_rate: f64 },
    /// wins + losses exceed closed trades
    OutcomesExceedTrades { outcomes: u32, closed: u32 },
    /// win_rate outside [0, 1] or not a number
    WinRateOutOfRange { win_rate: f64 },
}

impl std::fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQualityIssue::WinRateWithoutTrades { win_rate } => {
                write!(f, "win_rate {} present with zero closed trades", win_rate)
            }
            DataQualityIssue::OutcomesExceedTrades { outcomes, closed } => {
                write!(f, "{} wins+losses exceed {} closed trades", outcomes, closed)
            }
            DataQualityIssue::WinRateOutOfRange { win_rate } => {
                write!(f, "win_rate {} outside [0, 1]", win_rate)
            }
        }
    }
}

impl PerformanceRecord {
    /// Build a record, deriving the win rate from the trade counts
    pub fn new(
        date: NaiveDate,
        num_selections: u32,
        num_trades_closed: u32,
        num_wins: u32,
        num_losses: u32,
        total_return: Decimal,
    ) -> Self {
        let win_rate = if num_trades_closed > 0 {
            num_wins as f64 / num_trades_closed as f64
        } else {
            0.0
        };

        Self {
            date,
            num_selections,
            num_trades_closed,
            num_wins,
            num_losses,
            win_rate,
            total_return,
            sharpe_ratio: None,
        }
    }

    /// Check the record's invariants
    pub fn issues(&self) -> Vec<DataQualityIssue> {
        let mut issues = Vec::new();

        if !(0.0..=1.0).contains(&self.win_rate) {
            issues.push(DataQualityIssue::WinRateOutOfRange {
                win_rate: self.win_rate,
            });
        }
        if self.num_trades_closed == 0 && self.win_rate != 0.0 {
            issues.push(DataQualityIssue::WinRateWithoutTrades {
                win_rate: self.win_rate,
            });
        }
        let outcomes = self.num_wins.saturating_add(self.num_losses);
        if outcomes > self.num_trades_closed {
            issues.push(DataQualityIssue::OutcomesExceedTrades {
                outcomes,
                closed: self.num_trades_closed,
            });
        }

        issues
    }

    /// Wins that can be trusted for aggregation. Malformed records count as
    /// zero wins and log a data-quality warning.
    pub fn trusted_wins(&self) -> u32 {
        let issues = self.issues();
        if issues.is_empty() {
            return self.num_wins;
        }
        for issue in &issues {
            warn!(
                "Data quality: performance record {} treated as win_rate 0 ({})",
                self.date, issue
            );
        }
        0
    }
}

/// Symbols picked by the selection stage on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub date: NaiveDate,
    pub symbols: Vec<String>,
}

/// Sharpe ratio of a return series (risk-free rate 0).
///
/// Returns `None` with fewer than two observations and `Some(0.0)` when the
/// series has no variance.
pub fn sharpe_ratio(returns: &[Decimal]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }

    let values: Vec<f64> = returns.iter().map(|r| r.to_f64().unwrap_or(0.0)).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    if variance > 0.0 {
        Some(mean / variance.sqrt())
    } else {
        Some(0.0)
    }
}
