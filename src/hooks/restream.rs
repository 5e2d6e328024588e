//! Restream orchestration contract

use async_trait::async_trait;

use crate::error::Result;
use crate::registry::StreamKey;

/// Starts and stops restreaming to external RTMP destinations
#[async_trait]
pub trait RestreamControl: Send + Sync {
    /// Begin restreaming `key`, sourcing from `stream_path`
    async fn start(&self, key: &StreamKey, stream_path: &str) -> Result<()>;

    /// Stop restreaming `key`
    async fn stop(&self, key: &StreamKey) -> Result<()>;
}
