//! RTMP relay session lifecycle and admission control
//!
//! The core of a single-process streaming relay: it authenticates
//! publish/playback requests, enforces single-publisher-per-key via forced
//! takeover, rate-limits abusive viewers, polices stream health, and reaps
//! connections that die without a clean disconnect.
//!
//! The RTMP wire protocol itself, storage, restreaming, and notifications
//! are external collaborators reached through the [`hooks`] traits; this
//! crate owns the concurrent session state machine in between.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use rtmp_relay::{Collaborators, RelayConfig, SessionController};
//!
//! # fn wire_up() -> Collaborators { unimplemented!() }
//! # async fn run() {
//! let hooks: Collaborators = wire_up();
//! let controller = Arc::new(SessionController::new(RelayConfig::default(), hooks));
//! let tasks = controller.spawn_background_tasks();
//!
//! // Feed transport events as they arrive:
//! controller.on_connect(1, "203.0.113.9".parse().unwrap()).await;
//! let _ = controller.on_publish(1, "203.0.113.9".parse().unwrap(), "/live/my-key").await;
//! # for t in tasks { t.abort(); }
//! # }
//! ```

pub mod admission;
pub mod config;
pub mod error;
pub mod health;
pub mod hooks;
pub mod lifecycle;
pub mod monitor;
pub mod registry;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use health::{HealthStatus, MonitorSummary, SessionHealth};
pub use hooks::Collaborators;
pub use lifecycle::{SessionController, SessionEvent};
pub use registry::{Session, SessionRegistry, SessionRole, StreamKey};
