//! Session registry.
//!
//! Replaces ambient process-global chat state with an explicit registry
//! keyed by session identifier. Each entry is guarded by its own
//! `tokio::sync::Mutex`; a chat turn holds that lock from classification
//! through the history append, which is what keeps two concurrent requests
//! for the same session from interleaving their appends.

use crate::session::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use xplain_common::{Error, Result};

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a session, creating it when the identifier is new.
    pub async fn get_or_create(&self, id: &str) -> Arc<Mutex<Session>> {
        // Fast path: read lock only
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = %id, "Creating session");
                Arc::new(Mutex::new(Session::new(id)))
            })
            .clone()
    }

    /// Get an existing session.
    pub async fn get(&self, id: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Remove a session. Returns whether it existed.
    pub async fn evict(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Session evicted");
        }
        removed
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
