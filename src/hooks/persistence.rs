//! Session persistence contract
//!
//! Persistence is best-effort audit. The in-memory registry stays
//! authoritative; a failed write is logged and never blocks a lifecycle
//! transition.

use async_trait::async_trait;
use std::net::IpAddr;

use crate::error::Result;
use crate::registry::StreamKey;

/// Persists session records for auditing
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Record a newly promoted session
    async fn create_record(
        &self,
        session_id: u64,
        key: &StreamKey,
        ip: IpAddr,
        is_publisher: bool,
    ) -> Result<()>;

    /// Finalize the record for a session that ended
    async fn end_record(&self, session_id: u64) -> Result<()>;

    /// Finalize every open record for a key (shutdown cleanup)
    async fn end_all_active_for_key(&self, key: &StreamKey) -> Result<()>;
}
