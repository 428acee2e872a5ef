use super::StateStore;
use crate::error::StoreError;
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Directory-backed store.
///
/// Whole values live in `<key>.json` and are replaced through a temporary
/// file and rename, so a crash mid-write leaves the previous value intact.
/// Logs live in `<key>.jsonl`, one JSON document per line.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        debug!("Opened state store at {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        Self::check_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn log_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        Self::check_key(key)?;
        Ok(self.dir.join(format!("{}.jsonl", key)))
    }

    fn check_key(key: &str) -> Result<(), StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(StoreError::Corrupted {
                key: key.to_string(),
                reason: "keys may only contain [A-Za-z0-9_-]".to_string(),
            })
        }
    }

    /// Cut a torn final entry left by a crash mid-append so the next entry
    /// starts on its own line.
    async fn trim_torn_tail(file: &mut fs::File, key: &str) -> Result<(), StoreError> {
        let len = file.metadata().await?.len();
        if len == 0 {
            return Ok(());
        }
        file.seek(SeekFrom::End(-1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        if last[0] == b'\n' {
            return Ok(());
        }

        let mut content = Vec::with_capacity(len as usize);
        file.seek(SeekFrom::Start(0)).await?;
        file.read_to_end(&mut content).await?;
        let keep = content
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        warn!(
            "Dropping {} torn bytes at the end of log {}",
            content.len() - keep,
            key
        );
        file.set_len(keep as u64).await?;
        Ok(())
    }

    fn encode(key: &str, value: &Value) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.value_path(key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupted {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.value_path(key)?;
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        let bytes = Self::encode(key, &value)?;

        let _guard = self.write_lock.lock().await;
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn append(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.log_path(key)?;
        let mut line = Self::encode(key, &value)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .await?;
        Self::trim_torn_tail(&mut file, key).await?;
        file.seek(SeekFrom::End(0)).await?;
        file.write_all(&line).await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn read_log(&self, key: &str) -> Result<Vec<Value>, StoreError> {
        let path = self.log_path(key)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut entries = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            match serde_json::from_str(line) {
                Ok(value) => entries.push(value),
                // A torn final line is what a crash during append leaves behind
                Err(e) if index + 1 == lines.len() => {
                    warn!("Ignoring torn trailing entry in log {}: {}", key, e);
                }
                Err(e) => {
                    return Err(StoreError::Corrupted {
                        key: key.to_string(),
                        reason: format!("line {}: {}", index + 1, e),
                    })
                }
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert_eq!(store.read("workflow_state").await.unwrap(), None);
        store
            .write("workflow_state", json!({"current_stage": "SELECT"}))
            .await
            .unwrap();
        assert_eq!(
            store.read("workflow_state").await.unwrap(),
            Some(json!({"current_stage": "SELECT"}))
        );
        assert!(!dir.path().join("workflow_state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.append("events", json!({"n": 1})).await.unwrap();
            store.append("events", json!({"n": 2})).await.unwrap();
        }

        let store = FileStore::open(dir.path()).await.unwrap();
        let entries = store.read_log("events").await.unwrap();
        assert_eq!(entries, vec![json!({"n": 1}), json!({"n": 2})]);
    }

    #[tokio::test]
    async fn test_torn_trailing_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.append("events", json!({"n": 1})).await.unwrap();
        std::fs::write(
            dir.path().join("events.jsonl"),
            "{\"n\":1}\n{\"n\":2}\n{\"n\":",
        )
        .unwrap();

        let entries = store.read_log("events").await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_append_after_torn_tail_keeps_log_readable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("performance_records.jsonl"), "{\"n\":1}\n{\"n\":").unwrap();
        assert_eq!(store.read_log("performance_records").await.unwrap().len(), 1);

        store.append("performance_records", json!({"n": 2})).await.unwrap();
        store.append("performance_records", json!({"n": 3})).await.unwrap();

        let entries = store.read_log("performance_records").await.unwrap();
        assert_eq!(entries, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
    }

    #[tokio::test]
    async fn test_append_after_torn_only_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("events.jsonl"), "{\"n\":").unwrap();

        store.append("events", json!({"n": 1})).await.unwrap();
        assert_eq!(store.read_log("events").await.unwrap(), vec![json!({"n": 1})]);
    }

    #[tokio::test]
    async fn test_corrupted_middle_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("events.jsonl"), "{\"n\":1}\nnot json\n{\"n\":3}\n").unwrap();

        assert!(matches!(
            store.read_log("events").await,
            Err(StoreError::Corrupted { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.read("../escape").await.is_err());
    }
}
