//! Session persistence
//!
//! One durable slot holding the [`SessionRecord`] as JSON. The file store
//! writes a sibling temp file and renames it over the target so readers never
//! observe a half-written record.

use super::types::SessionRecord;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Durable storage for the single session record
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the stored record, `None` when absent
    async fn load(&self) -> Result<Option<SessionRecord>>;

    /// Replace the stored record
    async fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Remove the stored record (no-op when absent)
    async fn remove(&self) -> Result<()>;
}

/// JSON file backed store
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<SessionRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // A corrupt record is treated as no session
        match serde_json::from_slice::<SessionRecord>(&bytes) {
            Ok(record) => {
                debug!(path = %self.path.display(), username = %record.username, "Session loaded");
                Ok(Some(record))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable session record");
                Ok(None)
            }
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::Session(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store (tests, embedding without persistence)
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: SessionRecord) -> Self {
        Self {
            slot: Mutex::new(Some(record)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionRecord>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        *self.slot.lock().await = Some(record.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            username: "operator".to_string(),
            roles: vec!["ROLE_USER".to_string()],
            token: "abc".to_string(),
            name: "operator".to_string(),
            role: "ROLE_USER".to_string(),
        }
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        assert!(store.load().await.unwrap().is_none());
        store.save(&record()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(record()));
        assert!(!store.temp_path().exists());

        store.remove().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // second remove is a no-op
        store.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_corrupt_record_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileSessionStore::new(path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        store.save(&record()).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().username, "operator");
        store.remove().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
