//! Per-connection session state
//!
//! This module defines the session row stored in the registry: role,
//! liveness signals, and the bounded bitrate history publishers accumulate.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use super::key::StreamKey;

/// Role of a registered connection
///
/// A fresh session is `Provisional` until an authorized publish or play
/// request promotes it. A row can never hold both roles; promotion is a
/// single state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Transport connected, no publish/play request accepted yet
    Provisional,
    /// Connection ingesting a live stream under its key
    Publisher,
    /// Connection playing back a stream key's content
    Viewer,
}

/// One throughput measurement for a publisher
#[derive(Debug, Clone, Copy)]
pub struct BitrateSample {
    /// When the sample was computed
    pub at: Instant,
    /// Estimated throughput in bits per second
    pub bits_per_sec: u64,
}

/// Cumulative byte counter snapshot from the last estimator pass
#[derive(Debug, Clone, Copy)]
pub struct ByteCheckpoint {
    /// Cumulative bytes reported by the transport
    pub bytes: u64,
    /// When the counter was read
    pub at: Instant,
}

/// Session row for a single transport connection
#[derive(Debug)]
pub struct Session {
    /// Transport-assigned connection ID
    pub id: u64,

    /// Remote peer IP
    pub ip: IpAddr,

    /// Stream key (set on promotion)
    pub key: Option<StreamKey>,

    /// Current role
    pub role: SessionRole,

    /// Connection start time
    pub connected_at: Instant,

    /// Last time any lifecycle or data signal touched this session
    pub last_activity: Instant,

    /// Last time a data packet arrived
    pub last_data_packet: Option<Instant>,

    /// Data packets observed on this connection
    pub data_packets: u64,

    /// Bytes received on this connection
    pub bytes_received: u64,

    /// Bounded, time-ordered throughput samples (publishers only)
    pub bitrate_history: VecDeque<BitrateSample>,

    /// Byte counter snapshot from the previous estimator pass
    pub last_bytes_check: Option<ByteCheckpoint>,

    /// When sustained critically-low throughput was first detected
    pub low_quality_start: Option<Instant>,
}

impl Session {
    /// Create a new provisional session
    pub fn new(id: u64, ip: IpAddr, now: Instant) -> Self {
        Self {
            id,
            ip,
            key: None,
            role: SessionRole::Provisional,
            connected_at: now,
            last_activity: now,
            last_data_packet: None,
            data_packets: 0,
            bytes_received: 0,
            bitrate_history: VecDeque::new(),
            last_bytes_check: None,
            low_quality_start: None,
        }
    }

    /// Promote to publisher for the given key
    pub fn promote_publisher(&mut self, key: StreamKey, now: Instant) {
        self.role = SessionRole::Publisher;
        self.key = Some(key);
        self.last_activity = now;
    }

    /// Promote to viewer for the given key
    pub fn promote_viewer(&mut self, key: StreamKey, now: Instant) {
        self.role = SessionRole::Viewer;
        self.key = Some(key);
        self.last_activity = now;
    }

    /// Whether this session is the publisher for `key`
    pub fn publishes(&self, key: &StreamKey) -> bool {
        self.role == SessionRole::Publisher && self.key.as_ref() == Some(key)
    }

    /// Record a data packet arrival
    pub fn touch_data(&mut self, bytes: u64, now: Instant) {
        self.last_activity = now;
        self.last_data_packet = Some(now);
        self.data_packets += 1;
        self.bytes_received += bytes;
    }

    /// Latest bitrate sample, or 0 with no history
    pub fn current_bitrate(&self) -> u64 {
        self.bitrate_history
            .back()
            .map(|s| s.bits_per_sec)
            .unwrap_or(0)
    }

    /// Mean over the full history, or 0 with no history
    pub fn average_bitrate(&self) -> u64 {
        if self.bitrate_history.is_empty() {
            return 0;
        }
        let sum: u64 = self.bitrate_history.iter().map(|s| s.bits_per_sec).sum();
        sum / self.bitrate_history.len() as u64
    }

    /// Maximum over the full history, or 0 with no history
    pub fn peak_bitrate(&self) -> u64 {
        self.bitrate_history
            .iter()
            .map(|s| s.bits_per_sec)
            .max()
            .unwrap_or(0)
    }

    /// When the newest bitrate sample was taken
    pub fn last_sample_at(&self) -> Option<Instant> {
        self.bitrate_history.back().map(|s| s.at)
    }

    /// Time since the last activity signal
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn session() -> Session {
        Session::new(1, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)), Instant::now())
    }

    #[test]
    fn test_new_session_is_provisional() {
        let s = session();
        assert_eq!(s.role, SessionRole::Provisional);
        assert!(s.key.is_none());
        assert_eq!(s.current_bitrate(), 0);
        assert_eq!(s.average_bitrate(), 0);
        assert_eq!(s.peak_bitrate(), 0);
    }

    #[test]
    fn test_promotion_is_exclusive() {
        let mut s = session();
        let key = StreamKey::new("k1");
        s.promote_publisher(key.clone(), Instant::now());
        assert_eq!(s.role, SessionRole::Publisher);
        assert!(s.publishes(&key));

        // Re-promotion to viewer replaces the role, never combines
        s.promote_viewer(key.clone(), Instant::now());
        assert_eq!(s.role, SessionRole::Viewer);
        assert!(!s.publishes(&key));
    }

    #[test]
    fn test_bitrate_aggregates() {
        let mut s = session();
        let now = Instant::now();
        for bps in [1_000_000u64, 2_000_000, 3_000_000] {
            s.bitrate_history.push_back(BitrateSample {
                at: now,
                bits_per_sec: bps,
            });
        }

        assert_eq!(s.current_bitrate(), 3_000_000);
        assert_eq!(s.average_bitrate(), 2_000_000);
        assert_eq!(s.peak_bitrate(), 3_000_000);
    }

    #[test]
    fn test_touch_data() {
        let mut s = session();
        let now = Instant::now();
        s.touch_data(1500, now);
        s.touch_data(1500, now);

        assert_eq!(s.data_packets, 2);
        assert_eq!(s.bytes_received, 3000);
        assert_eq!(s.last_data_packet, Some(now));
    }
}
