//! Session Module
//!
//! ## Overview
//! Explicit session context shared by every adapter call. The context owns
//! the in-memory copy of the [`SessionRecord`] and mirrors every change to a
//! [`SessionStore`].
//!
//! ## Lifecycle
//! - `init`: load the persisted record (startup)
//! - `establish`: store the record returned by login
//! - `clear`: logout, or a 401 from any authenticated call
//!
//! ## Module layout
//! - `types`: session record, login/register shapes
//! - `store`: persistence (file, memory)

pub mod store;
pub mod types;

pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::*;

use crate::error::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Session context passed to the API client
pub struct SessionContext {
    current: RwLock<Option<SessionRecord>>,
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    /// Create an empty context backed by `store`; call [`init`](Self::init) to load
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            current: RwLock::new(None),
            store,
        }
    }

    /// Context with no persistence
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Load the persisted record into memory
    pub async fn init(&self) -> Result<Option<SessionRecord>> {
        let loaded = self.store.load().await?;
        if let Some(ref record) = loaded {
            info!(username = %record.username, "Session restored");
        }
        *self.current.write().await = loaded.clone();
        Ok(loaded)
    }

    /// Replace the session (login)
    ///
    /// The write guard is held across the store call so memory and store
    /// change together.
    pub async fn establish(&self, record: SessionRecord) -> Result<()> {
        let mut current = self.current.write().await;
        self.store.save(&record).await?;
        info!(username = %record.username, role = %record.role, "Session established");
        *current = Some(record);
        Ok(())
    }

    /// Drop the session (logout / 401)
    ///
    /// The in-memory copy is cleared even when the store fails.
    pub async fn clear(&self) -> Result<()> {
        let mut current = self.current.write().await;
        let removed = self.store.remove().await;
        if let Some(record) = current.take() {
            info!(username = %record.username, "Session cleared");
        }
        if let Err(e) = removed {
            warn!(error = %e, "Failed to remove persisted session");
            return Err(e);
        }
        Ok(())
    }

    /// Snapshot of the current record
    pub async fn current(&self) -> Option<SessionRecord> {
        self.current.read().await.clone()
    }

    /// Whether private pages are accessible
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Bearer token and username for outbound requests
    pub async fn credentials(&self) -> Option<(String, String)> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|r| (r.token.clone(), r.username.clone()))
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            username: "operator".to_string(),
            roles: vec!["ROLE_USER".to_string()],
            token: "tok".to_string(),
            name: "operator".to_string(),
            role: "ROLE_USER".to_string(),
        }
    }

    #[tokio::test]
    async fn test_init_restores_persisted_record() {
        let store = Arc::new(MemorySessionStore::with_record(record()));
        let ctx = SessionContext::new(store);
        assert!(!ctx.is_authenticated().await);

        ctx.init().await.unwrap();
        assert!(ctx.is_authenticated().await);
        assert_eq!(
            ctx.credentials().await,
            Some(("tok".to_string(), "operator".to_string()))
        );
    }

    #[tokio::test]
    async fn test_establish_and_clear() {
        let store = Arc::new(MemorySessionStore::new());
        let ctx = SessionContext::new(store.clone());

        ctx.establish(record()).await.unwrap();
        assert!(store.load().await.unwrap().is_some());

        ctx.clear().await.unwrap();
        assert!(ctx.current().await.is_none());
        assert!(store.load().await.unwrap().is_none());
    }

    /// Memory store whose `remove` stalls, widening the clear/establish window
    struct SlowRemoveStore(MemorySessionStore);

    #[async_trait::async_trait]
    impl SessionStore for SlowRemoveStore {
        async fn load(&self) -> Result<Option<SessionRecord>> {
            self.0.load().await
        }

        async fn save(&self, record: &SessionRecord) -> Result<()> {
            self.0.save(record).await
        }

        async fn remove(&self) -> Result<()> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.0.remove().await
        }
    }

    #[tokio::test]
    async fn test_login_during_clear_keeps_store_in_sync() {
        let store = Arc::new(SlowRemoveStore(MemorySessionStore::with_record(record())));
        let ctx = Arc::new(SessionContext::new(store.clone()));
        ctx.init().await.unwrap();

        let clearing = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.clear().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let mut fresh = record();
        fresh.token = "tok-2".to_string();
        ctx.establish(fresh).await.unwrap();
        clearing.await.unwrap().unwrap();

        let in_memory = ctx.current().await.map(|r| r.token);
        let persisted = store.load().await.unwrap().map(|r| r.token);
        assert_eq!(in_memory, persisted);
        assert_eq!(in_memory.as_deref(), Some("tok-2"));
    }
}
