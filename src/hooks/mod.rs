//! External collaborator contracts
//!
//! The relay core never talks to the wire, the database, or downstream
//! services directly. Everything outside the session registry is reached
//! through these traits, so every call can fail or time out without taking
//! session state down with it.

pub mod key_store;
pub mod notifier;
pub mod persistence;
pub mod restream;
pub mod transport;

pub use key_store::KeyStore;
pub use notifier::Notifier;
pub use persistence::SessionPersistence;
pub use restream::RestreamControl;
pub use transport::TransportControl;

use std::sync::Arc;

/// The full set of collaborators the lifecycle controller is wired to
#[derive(Clone)]
pub struct Collaborators {
    /// RTMP transport control surface
    pub transport: Arc<dyn TransportControl>,
    /// Stream key verification
    pub keys: Arc<dyn KeyStore>,
    /// Session record persistence
    pub persistence: Arc<dyn SessionPersistence>,
    /// Restream orchestration
    pub restream: Arc<dyn RestreamControl>,
    /// Connect/disconnect notifications
    pub notifier: Arc<dyn Notifier>,
}
