//! Bitrate estimation from cumulative byte counters
//!
//! The transport exposes one cumulative byte counter per publishing key.
//! Each monitoring tick reads it and derives instantaneous throughput from
//! the delta since the previous read. Short gaps and non-positive deltas
//! are skipped: sub-interval reads amplify jitter, and a counter reset
//! (transport restart) would otherwise produce a garbage spike.

use std::time::Instant;

use crate::config::RelayConfig;
use crate::registry::{BitrateSample, ByteCheckpoint, Session};

/// Derives per-publisher throughput from periodic byte counter samples
pub struct BitrateEstimator {
    min_sample_interval: std::time::Duration,
    history_cap: usize,
}

impl BitrateEstimator {
    /// Create an estimator from the relay configuration
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            min_sample_interval: config.min_sample_interval,
            history_cap: config.bitrate_history_cap,
        }
    }

    /// Feed one cumulative byte counter reading for a publisher
    ///
    /// The first reading only records a checkpoint and reports 0. Later
    /// readings produce a new bitrate sample when at least the minimum
    /// interval elapsed and the counter moved forward; otherwise no sample
    /// is emitted this tick.
    pub fn record(
        &self,
        session: &mut Session,
        cumulative_bytes: u64,
        now: Instant,
    ) -> Option<u64> {
        let Some(checkpoint) = session.last_bytes_check else {
            session.last_bytes_check = Some(ByteCheckpoint {
                bytes: cumulative_bytes,
                at: now,
            });
            return Some(0);
        };

        let elapsed = now.saturating_duration_since(checkpoint.at);
        if elapsed < self.min_sample_interval {
            return None;
        }

        if cumulative_bytes <= checkpoint.bytes {
            // Counter stalled or reset; re-anchor and wait for fresh data
            session.last_bytes_check = Some(ByteCheckpoint {
                bytes: cumulative_bytes,
                at: now,
            });
            return None;
        }

        let delta = cumulative_bytes - checkpoint.bytes;
        let elapsed_ms = elapsed.as_millis() as u64;
        let bits_per_sec = delta.saturating_mul(8).saturating_mul(1000) / elapsed_ms;

        session.last_bytes_check = Some(ByteCheckpoint {
            bytes: cumulative_bytes,
            at: now,
        });
        session.bitrate_history.push_back(BitrateSample {
            at: now,
            bits_per_sec,
        });
        while session.bitrate_history.len() > self.history_cap {
            session.bitrate_history.pop_front();
        }

        Some(bits_per_sec)
    }
}
