//! Logical persistence contract shared by every stateful component.
//!
//! Whole-record values are replaced atomically with `write`; append-only
//! logs grow with `append` and are read back in insertion order.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Well-known store keys
pub mod keys {
    pub const WORKFLOW_STATE: &str = "workflow_state";
    pub const TRIGGER_STATE: &str = "trigger_state";
    pub const STRATEGY_PARAMETERS: &str = "strategy_parameters";
    pub const PERFORMANCE_RECORDS: &str = "performance_records";
    pub const SELECTION_RECORDS: &str = "selection_records";
    pub const ERROR_EVENTS: &str = "error_events";
    pub const RECOVERY_ATTEMPTS: &str = "recovery_attempts";
    pub const BACKTEST_RESULTS: &str = "backtest_results";
}

/// Key-value and append-log storage
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the whole value under `key`
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the whole value under `key`
    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Append one entry to the log under `key`
    async fn append(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Read every entry of the log under `key`, oldest first
    async fn read_log(&self, key: &str) -> Result<Vec<Value>, StoreError>;
}

/// Read and deserialize a whole value
pub async fn load<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.read(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Serialize and replace a whole value
pub async fn save<T: Serialize>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.write(key, value).await
}

/// Serialize and append one log entry
pub async fn append<T: Serialize>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.append(key, value).await
}

/// Read and deserialize a whole log
pub async fn load_log<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Vec<T>, StoreError> {
    store
        .read_log(key)
        .await?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })
        })
        .collect()
}
