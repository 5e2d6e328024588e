//! Session registry implementation
//!
//! The single authoritative in-memory table of active connections. All
//! admission decisions and monitoring sweeps read and mutate this table;
//! persistence is best-effort audit, the registry is the source of truth.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use super::key::StreamKey;
use super::session::Session;

/// Central registry of active sessions
///
/// Thread-safe via `RwLock`. Monitoring ticks iterate a snapshot of IDs and
/// re-fetch each row, so entries disappearing mid-sweep are skipped rather
/// than failed on.
pub struct SessionRegistry {
    /// Map of session ID to session row
    sessions: RwLock<HashMap<u64, Arc<RwLock<Session>>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a provisional session for a new connection
    ///
    /// A second insert for the same ID leaves the existing row in place,
    /// since lifecycle events may race and the earlier row carries state.
    pub async fn insert(&self, id: u64, ip: IpAddr, now: Instant) -> Arc<RwLock<Session>> {
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(id)
                .or_insert_with(|| Arc::new(RwLock::new(Session::new(id, ip, now)))),
        )
    }

    /// Get a session row by ID
    pub async fn get(&self, id: u64) -> Option<Arc<RwLock<Session>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Get the row for `id`, creating a provisional one if an earlier
    /// lifecycle event has not landed yet
    pub async fn get_or_insert(&self, id: u64, ip: IpAddr, now: Instant) -> Arc<RwLock<Session>> {
        if let Some(row) = self.get(id).await {
            return row;
        }
        self.insert(id, ip, now).await
    }

    /// Remove a session row
    ///
    /// Idempotent: removing an absent ID is a no-op returning `None`.
    pub async fn remove(&self, id: u64) -> Option<Arc<RwLock<Session>>> {
        self.sessions.write().await.remove(&id)
    }

    /// All sessions registered under a stream key, publishers and viewers
    pub async fn all_by_stream_key(&self, key: &StreamKey) -> Vec<Arc<RwLock<Session>>> {
        let sessions = self.sessions.read().await;
        let mut out = Vec::new();
        for row in sessions.values() {
            if row.read().await.key.as_ref() == Some(key) {
                out.push(Arc::clone(row));
            }
        }
        out
    }

    /// Whether any session other than `exclude` publishes `key`
    pub async fn has_active_publisher(&self, key: &StreamKey, exclude: Option<u64>) -> bool {
        let sessions = self.sessions.read().await;
        for row in sessions.values() {
            let session = row.read().await;
            if Some(session.id) == exclude {
                continue;
            }
            if session.publishes(key) {
                return true;
            }
        }
        false
    }

    /// Snapshot of registered session IDs for tick iteration
    pub async fn snapshot_ids(&self) -> Vec<u64> {
        self.sessions.read().await.keys().copied().collect()
    }

    /// Number of registered sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Stream keys with at least one registered session
    pub async fn active_keys(&self) -> Vec<StreamKey> {
        let sessions = self.sessions.read().await;
        let mut keys = Vec::new();
        for row in sessions.values() {
            let session = row.read().await;
            if let Some(key) = &session.key {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }

    /// Remove every session row (shutdown cleanup)
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
