//! Stream notification contract
//!
//! Connect/disconnect announcements to the surrounding layer (chat bot,
//! dashboard, ...). Delivery failure is swallowed by callers and never
//! blocks session teardown.

use async_trait::async_trait;

use crate::error::Result;
use crate::registry::StreamKey;

/// Sends stream lifecycle notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce that a publisher attached to `key`
    async fn send_connect_message(&self, key: &StreamKey) -> Result<()>;

    /// Announce that the stream under `key` ended, with a reason
    async fn send_disconnect_message(&self, key: &StreamKey, reason: &str) -> Result<()>;
}
