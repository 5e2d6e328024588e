//! Session registry
//!
//! The registry is the single authoritative in-memory table of active
//! connections. Lifecycle handlers mutate it directly; monitoring ticks
//! iterate snapshots of it. At most one session per stream key may hold
//! the publisher role at any instant; the takeover coordinator enforces
//! this before any promotion.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<SessionRegistry>
//!                 ┌───────────────────────────┐
//!                 │ sessions: HashMap<u64,    │
//!                 │   Arc<RwLock<Session>> >  │
//!                 └────────────┬──────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        ▼                     ▼                     ▼
//!  [lifecycle events]   [monitor tick]         [stale reaper]
//!  promote / remove     bitrate + quality      liveness sweep
//! ```

pub mod key;
pub mod session;
pub mod store;

pub use key::StreamKey;
pub use session::{BitrateSample, ByteCheckpoint, Session, SessionRole};
pub use store::SessionRegistry;
