//! Stream key store contract

use async_trait::async_trait;

use crate::error::Result;
use crate::registry::StreamKey;

/// Verifies stream keys against persistent storage
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Whether the key is known and active
    ///
    /// Implementations should record last-used on success as a
    /// fire-and-forget side effect; the admission decision never waits on
    /// that write. `Err` and `Ok(false)` both reject the connection.
    async fn verify_key(&self, key: &StreamKey) -> Result<bool>;
}
