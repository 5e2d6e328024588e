//! Session lifecycle orchestration
//!
//! The controller binds transport lifecycle events to the registry and
//! admission gates, and the takeover coordinator keeps the
//! single-publisher-per-key invariant under racing publish requests.

pub mod controller;
pub mod events;
pub mod takeover;

pub use controller::{SessionController, STREAM_ENDED_REASON};
pub use events::SessionEvent;
pub use takeover::TakeoverCoordinator;
