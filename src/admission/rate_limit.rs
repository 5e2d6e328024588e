//! Per-IP connection rate limiting
//!
//! Sliding-window attempt counter applied to playback requests only.
//! Publishers are exempt, and loopback addresses are always allowed so
//! local auxiliary publishers never get throttled.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Sliding-window playback attempt counter per source IP
pub struct ConnectionRateLimiter {
    /// Attempts allowed per IP within the window
    max_per_ip: usize,
    /// Sliding window length
    window: Duration,
    /// Per-IP attempt timestamps, oldest first
    attempts: HashMap<IpAddr, VecDeque<Instant>>,
}

impl ConnectionRateLimiter {
    /// Create a limiter with the given window and per-IP cap
    pub fn new(max_per_ip: usize, window: Duration) -> Self {
        Self {
            max_per_ip,
            window,
            attempts: HashMap::new(),
        }
    }

    /// Check and record a playback attempt from `ip`
    ///
    /// Returns `true` if the attempt is within limits. Rejected attempts
    /// are not recorded, so a flood cannot extend its own window.
    pub fn check(&mut self, ip: IpAddr, now: Instant) -> bool {
        if ip.is_loopback() {
            return true;
        }

        let window = self.window;
        let log = self.attempts.entry(ip).or_default();
        Self::prune(log, window, now);

        if log.len() < self.max_per_ip {
            log.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drop all recorded attempts for `ip`
    ///
    /// Used when a publisher attaches so viewers waiting on that key can
    /// reconnect immediately.
    pub fn forget(&mut self, ip: &IpAddr) {
        self.attempts.remove(ip);
    }

    /// Periodic sweep removing IPs whose pruned window is empty
    pub fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.attempts.retain(|_, log| {
            Self::prune(log, window, now);
            !log.is_empty()
        });
    }

    /// Number of IPs currently tracked
    pub fn tracked_ips(&self) -> usize {
        self.attempts.len()
    }

    fn prune(log: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(front) = log.front() {
            if now.saturating_duration_since(*front) >= window {
                log.pop_front();
            } else {
                break;
            }
        }
    }
}
