use super::StateStore;
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// In-process store, used for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<DashMap<String, Value>>,
    logs: Arc<DashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn append(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.logs.entry(key.to_string()).or_default().push(value);
        Ok(())
    }

    async fn read_log(&self, key: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .logs
            .get(key)
            .map(|entries| entries.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_replaces_whole_value() {
        let store = MemoryStore::new();
        store.write("k", json!({"a": 1})).await.unwrap();
        store.write("k", json!({"b": 2})).await.unwrap();

        assert_eq!(store.read("k").await.unwrap(), Some(json!({"b": 2})));
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store.append("log", json!(i)).await.unwrap();
        }

        assert_eq!(
            store.read_log("log").await.unwrap(),
            vec![json!(0), json!(1), json!(2)]
        );
        assert!(store.read_log("other").await.unwrap().is_empty());
    }
}
