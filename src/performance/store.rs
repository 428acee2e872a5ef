use super::record::{sharpe_ratio, PerformanceRecord, SelectionRecord};
use crate::error::StoreError;
use crate::persistence::{self, keys, StateStore};
use chrono::NaiveDate;
use log::{info, warn};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Aggregate view over the whole performance history
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub performance_records: usize,
    pub selection_records: usize,
    /// Distinct dates with a selection or performance record
    pub trading_days: usize,
    pub trades_closed: u64,
    pub wins: u64,
    /// wins / trades_closed over the whole history, 0 with no trades
    pub win_rate: f64,
    pub total_return: Decimal,
    pub first_activity: Option<NaiveDate>,
}

/// Append-only store of daily trading outcomes and selection history
pub struct PerformanceStore {
    store: Arc<dyn StateStore>,
    append_lock: Mutex<()>,
}

impl PerformanceStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            append_lock: Mutex::new(()),
        }
    }

    /// Append the record for a trading day.
    ///
    /// A day can only be recorded once. The Sharpe ratio is filled in from
    /// the daily return series when the writer did not supply one.
    pub async fn append_record(
        &self,
        mut record: PerformanceRecord,
    ) -> Result<PerformanceRecord, StoreError> {
        let _guard = self.append_lock.lock().await;
        let existing = self.records().await?;

        if existing.iter().any(|r| r.date == record.date) {
            return Err(StoreError::Duplicate {
                key: keys::PERFORMANCE_RECORDS.to_string(),
                reason: format!("performance record for {} already written", record.date),
            });
        }

        for issue in record.issues() {
            warn!("Data quality: appending record {} with {}", record.date, issue);
        }

        if record.sharpe_ratio.is_none() {
            let mut returns: Vec<Decimal> = existing.iter().map(|r| r.total_return).collect();
            returns.push(record.total_return);
            record.sharpe_ratio = sharpe_ratio(&returns);
        }

        persistence::append(self.store.as_ref(), keys::PERFORMANCE_RECORDS, &record).await?;
        info!(
            "Recorded performance for {}: {} trades, win rate {:.2}",
            record.date, record.num_trades_closed, record.win_rate
        );
        Ok(record)
    }

    /// Append the symbols selected on a day
    pub async fn append_selection(&self, selection: SelectionRecord) -> Result<(), StoreError> {
        let _guard = self.append_lock.lock().await;
        persistence::append(self.store.as_ref(), keys::SELECTION_RECORDS, &selection).await
    }

    /// All performance records ordered by date
    pub async fn records(&self) -> Result<Vec<PerformanceRecord>, StoreError> {
        let mut records: Vec<PerformanceRecord> =
            persistence::load_log(self.store.as_ref(), keys::PERFORMANCE_RECORDS).await?;
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    /// The most recent `count` records, oldest first
    pub async fn recent(&self, count: usize) -> Result<Vec<PerformanceRecord>, StoreError> {
        let records = self.records().await?;
        let skip = records.len().saturating_sub(count);
        Ok(records.into_iter().skip(skip).collect())
    }

    /// All selection records ordered by date
    pub async fn selections(&self) -> Result<Vec<SelectionRecord>, StoreError> {
        let mut selections: Vec<SelectionRecord> =
            persistence::load_log(self.store.as_ref(), keys::SELECTION_RECORDS).await?;
        selections.sort_by_key(|s| s.date);
        Ok(selections)
    }

    /// Whether a selection was recorded for `date`
    pub async fn has_selection_for(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.selections().await?.iter().any(|s| s.date == date))
    }

    /// Cumulative counts used by the retrain trigger
    pub async fn summary(&self) -> Result<PerformanceSummary, StoreError> {
        let records = self.records().await?;
        let selections = self.selections().await?;

        let days: BTreeSet<NaiveDate> = records
            .iter()
            .map(|r| r.date)
            .chain(selections.iter().map(|s| s.date))
            .collect();

        let trades_closed: u64 = records.iter().map(|r| r.num_trades_closed as u64).sum();
        let wins: u64 = records.iter().map(|r| r.trusted_wins() as u64).sum();
        let win_rate = if trades_closed > 0 {
            wins as f64 / trades_closed as f64
        } else {
            0.0
        };

        Ok(PerformanceSummary {
            performance_records: records.len(),
            selection_records: selections.iter().map(|s| s.symbols.len()).sum(),
            trading_days: days.len(),
            trades_closed,
            wins,
            win_rate,
            total_return: records.iter().map(|r| r.total_return).sum(),
            first_activity: days.iter().next().copied(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn store() -> PerformanceStore {
        PerformanceStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_one_record_per_day() {
        let perf = store();
        perf.append_record(PerformanceRecord::new(day(3), 10, 4, 2, 2, Decimal::new(1, 2)))
            .await
            .unwrap();

        let duplicate = perf
            .append_record(PerformanceRecord::new(day(3), 10, 4, 3, 1, Decimal::ZERO))
            .await;
        assert!(matches!(duplicate, Err(StoreError::Duplicate { .. })));
        assert_eq!(perf.records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sharpe_filled_from_second_record() {
        let perf = store();
        let first = perf
            .append_record(PerformanceRecord::new(day(3), 10, 4, 2, 2, Decimal::new(2, 2)))
            .await
            .unwrap();
        assert_eq!(first.sharpe_ratio, None);

        let second = perf
            .append_record(PerformanceRecord::new(day(4), 10, 4, 2, 2, Decimal::ZERO))
            .await
            .unwrap();
        assert!(second.sharpe_ratio.is_some());
    }

    #[tokio::test]
    async fn test_recent_returns_latest_window_in_date_order() {
        let perf = store();
        for d in [5, 3, 4, 6] {
            perf.append_record(PerformanceRecord::new(day(d), 1, 1, 1, 0, Decimal::ZERO))
                .await
                .unwrap();
        }

        let recent = perf.recent(2).await.unwrap();
        let dates: Vec<NaiveDate> = recent.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(5), day(6)]);
        assert_eq!(perf.recent(10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let perf = store();
        perf.append_record(PerformanceRecord::new(day(3), 2, 4, 3, 1, Decimal::ZERO))
            .await
            .unwrap();
        perf.append_record(PerformanceRecord::new(day(4), 2, 6, 3, 3, Decimal::ZERO))
            .await
            .unwrap();
        perf.append_selection(SelectionRecord {
            date: day(4),
            symbols: vec!["AAPL".into(), "MSFT".into()],
        })
        .await
        .unwrap();
        perf.append_selection(SelectionRecord {
            date: day(5),
            symbols: vec!["NVDA".into()],
        })
        .await
        .unwrap();

        let summary = perf.summary().await.unwrap();
        assert_eq!(summary.performance_records, 2);
        assert_eq!(summary.selection_records, 3);
        // day 3 has only a performance record, day 5 only a selection
        assert_eq!(summary.trading_days, 3);
        assert_eq!(summary.trades_closed, 10);
        assert!((summary.win_rate - 0.6).abs() < 1e-9);
        assert_eq!(summary.first_activity, Some(day(3)));
        assert!(perf.has_selection_for(day(5)).await.unwrap());
        assert!(!perf.has_selection_for(day(6)).await.unwrap());
    }
}
