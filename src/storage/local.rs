//! Local filesystem history storage.
//!
//! Writes go to a temporary sibling first and are renamed into place, so an
//! interrupted write never leaves a truncated history behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Movies, StorageConfig};
use crate::storage::HistoryStore;

/// History stored as a JSON file under a data directory.
#[derive(Debug, Clone)]
pub struct LocalHistoryStore {
    data_dir: PathBuf,
    file_name: String,
}

impl LocalHistoryStore {
    /// Create a store for `{data_dir}/{file_name}`.
    pub fn new(data_dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_name: file_name.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.data_dir, &config.history_file)
    }

    /// Full path of the history file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    fn tmp_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.tmp", self.file_name))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, self.path()).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl HistoryStore for LocalHistoryStore {
    async fn read(&self) -> Result<Movies> {
        let path = self.path();
        let bytes = Self::read_bytes(&path)
            .await
            .map_err(|e| AppError::history_load(&path, e))?;

        match bytes {
            Some(bytes) => {
                let history: Movies = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::history_load(&path, e))?;
                log::debug!("Loaded {} movies from {}", history.len(), path.display());
                Ok(history)
            }
            None => {
                log::info!("No history found at {}, starting fresh", path.display());
                Ok(Movies::new())
            }
        }
    }

    async fn save(&self, history: &Movies) -> Result<()> {
        let path = self.path();
        let bytes =
            serde_json::to_vec_pretty(history).map_err(|e| AppError::history_save(&path, e))?;

        self.write_bytes(&bytes)
            .await
            .map_err(|e| AppError::history_save(&path, e))?;

        log::debug!("Saved {} movies to {}", history.len(), path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::models::Movie;

    fn sample_history() -> Movies {
        let observed = DateTime::parse_from_rfc3339("2026-10-16T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let movie = Movie::new(
            "Heat",
            "1995",
            "https://yts.mx/movies/heat-1995",
            "https://yts.mx/assets/images/heat/medium-cover.jpg",
            observed,
        );
        Movies::from([(movie.title.clone(), movie)])
    }

    #[test]
    fn test_from_config_uses_history_path() {
        let config = StorageConfig {
            data_dir: PathBuf::from("/var/lib/yts"),
            history_file: "seen.json".to_string(),
        };
        let store = LocalHistoryStore::from_config(&config);
        assert_eq!(store.path(), config.history_path());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path(), "history.json");

        let history = store.read().await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_read() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path(), "history.json");

        store.save(&sample_history()).await.unwrap();
        let loaded = store.read().await.unwrap();

        assert_eq!(loaded, sample_history());
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_save_creates_data_dir() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path().join("nested/data"), "history.json");

        store.save(&sample_history()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path(), "history.json");

        store.save(&sample_history()).await.unwrap();
        store.save(&Movies::new()).await.unwrap();

        assert!(store.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_format() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path(), "history.json");
        store.save(&sample_history()).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["Heat"]["year"], "1995");
        assert_eq!(json["Heat"]["link"], "https://yts.mx/movies/heat-1995");
        assert_eq!(json["Heat"]["timestamp"], "2026-10-16T08:30:00Z");
        assert!(json["Heat"]["coverImage"].is_string());
    }

    #[tokio::test]
    async fn test_corrupt_history() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path(), "history.json");
        std::fs::write(store.path(), b"{\"Heat\": {\"year\": ").unwrap();

        assert!(matches!(
            store.read().await,
            Err(AppError::HistoryLoad { .. })
        ));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_history() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path(), "history.json");
        std::fs::write(store.path(), b"[\"Heat\", \"Alien\"]").unwrap();

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_tmp_file_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path(), "history.json");
        store.save(&sample_history()).await.unwrap();
        std::fs::write(store.tmp_path(), b"").unwrap();

        assert_eq!(store.load().await, sample_history());

        store.save(&Movies::new()).await.unwrap();
        assert!(!store.tmp_path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_save_into_file_path_fails() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let store = LocalHistoryStore::new(&blocker, "history.json");

        let err = store.save(&sample_history()).await.unwrap_err();
        assert!(err.is_persistence_failure());
    }
}
