//! Relay error types
//!
//! Admission rejections and collaborator failures surfaced to callers.

use std::net::IpAddr;

use crate::registry::StreamKey;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, RelayError>;

/// Error type for relay operations
#[derive(Debug, Clone)]
pub enum RelayError {
    /// Stream key is invalid or inactive
    AuthenticationFailed(StreamKey),
    /// Source IP exceeded the per-IP connection window
    RateLimited(IpAddr),
    /// Playback requested for a key with no active publisher
    NoActivePublisher(StreamKey),
    /// Stream path did not match the expected `/live/<key>` form
    InvalidStreamPath(String),
    /// An external collaborator call failed
    Collaborator(String),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::AuthenticationFailed(key) => {
                write!(f, "authentication failed for stream key: {}", key)
            }
            RelayError::RateLimited(ip) => write!(f, "connection rate limit exceeded: {}", ip),
            RelayError::NoActivePublisher(key) => {
                write!(f, "no active publisher for stream key: {}", key)
            }
            RelayError::InvalidStreamPath(path) => write!(f, "invalid stream path: {}", path),
            RelayError::Collaborator(msg) => write!(f, "collaborator error: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {}
