//! Transport layer contract
//!
//! The RTMP wire protocol (handshake, chunking, AMF) lives in a separate
//! library. The core only needs to kick connections, probe socket health,
//! and read the cumulative byte counter behind a stream key.

use async_trait::async_trait;

use crate::error::Result;
use crate::registry::StreamKey;

/// Control surface of the RTMP transport
#[async_trait]
pub trait TransportControl: Send + Sync {
    /// Force-close a connection at the transport layer
    ///
    /// Best-effort: callers remove the session from the registry whether or
    /// not this succeeds. Disconnecting an already-gone connection must not
    /// be treated as an error by implementations.
    async fn force_disconnect(&self, session_id: u64) -> Result<()>;

    /// Whether the transport still holds a live, readable and writable
    /// connection for this session
    async fn connection_alive(&self, session_id: u64) -> bool;

    /// Cumulative bytes transferred by the active publisher of `key`
    ///
    /// I/O-bound; callers wrap this in a timeout and treat failure as
    /// "no sample this tick".
    async fn stream_bytes(&self, key: &StreamKey) -> Result<u64>;
}
