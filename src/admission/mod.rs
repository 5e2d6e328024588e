//! Admission control
//!
//! Gates on playback requests: a sliding-window per-IP rate limiter and an
//! exponential retry backoff for viewers of keys with no publisher yet.
//! Publishers bypass both; only the authenticator and the takeover
//! coordinator stand between a publish request and promotion.

pub mod backoff;
pub mod rate_limit;

pub use backoff::{RetryDecision, ViewerRetryBackoff};
pub use rate_limit::ConnectionRateLimiter;
