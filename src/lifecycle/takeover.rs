//! Publisher takeover coordination
//!
//! Enforces the single-publisher-per-key invariant. A new publish request
//! for an occupied key evicts the prior publisher and every viewer under
//! that key before the newcomer is promoted. Check-evict-promote runs
//! inside a per-key critical section so two simultaneous publish requests
//! cannot both believe they are sole publisher.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::hooks::{RestreamControl, SessionPersistence, TransportControl};
use crate::registry::{SessionRegistry, StreamKey};

/// Serializes publish admission per stream key and runs evictions
pub struct TakeoverCoordinator {
    registry: Arc<SessionRegistry>,
    transport: Arc<dyn TransportControl>,
    persistence: Arc<dyn SessionPersistence>,
    restream: Arc<dyn RestreamControl>,
    /// Lazily created per-key admission locks
    key_locks: Mutex<HashMap<StreamKey, Arc<Mutex<()>>>>,
}

impl TakeoverCoordinator {
    /// Create a coordinator over the shared registry and collaborators
    pub fn new(
        registry: Arc<SessionRegistry>,
        transport: Arc<dyn TransportControl>,
        persistence: Arc<dyn SessionPersistence>,
        restream: Arc<dyn RestreamControl>,
    ) -> Self {
        Self {
            registry,
            transport,
            persistence,
            restream,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the admission lock for a key
    ///
    /// Held across the caller's check-evict-promote sequence; dropped
    /// guards are enough, no explicit unlock.
    pub async fn lock_key(&self, key: &StreamKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.key_locks.lock().await;
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Evict every session under `key` except the incoming publisher
    ///
    /// Per session: transport disconnect (best-effort), registry removal
    /// (authoritative), record finalization (best-effort). One session's
    /// failure never aborts the rest. Restreaming for the key is stopped
    /// once at the end if anything was evicted. Returns the eviction count.
    pub async fn evict_existing(&self, key: &StreamKey, new_session_id: u64) -> usize {
        let mut evicted = 0;

        for row in self.registry.all_by_stream_key(key).await {
            let (id, was_publisher) = {
                let session = row.read().await;
                (session.id, session.publishes(key))
            };
            if id == new_session_id {
                continue;
            }

            tracing::info!(
                stream = %key,
                session_id = id,
                publisher = was_publisher,
                new_session_id,
                "Evicting session for takeover"
            );

            if let Err(e) = self.transport.force_disconnect(id).await {
                tracing::warn!(session_id = id, error = %e, "Takeover disconnect failed");
            }
            self.registry.remove(id).await;
            if let Err(e) = self.persistence.end_record(id).await {
                tracing::warn!(session_id = id, error = %e, "Failed to finalize evicted session");
            }

            evicted += 1;
        }

        if evicted > 0 {
            if let Err(e) = self.restream.stop(key).await {
                tracing::warn!(stream = %key, error = %e, "Failed to stop restream after takeover");
            }
        }

        evicted
    }

    /// Drop per-key locks nobody is holding or waiting on
    pub async fn prune_idle_locks(&self) {
        self.key_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
