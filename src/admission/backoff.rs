//! Viewer retry backoff
//!
//! Viewers poll aggressively while waiting for a stream to come up. Each
//! (ip, key) pair gets an exponential wait between logged rejections so a
//! crowd of waiting viewers doesn't turn "no publisher yet" into a log storm.
//! All state for a key is dropped the instant a publisher attaches.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::registry::StreamKey;

/// Outcome of registering a no-publisher rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry arrived inside the wait window; reject without logging
    /// and without touching the counter
    Silent,
    /// Wait elapsed; the counter advanced and the rejection may be logged
    Logged {
        /// Logged rejections so far for this (ip, key)
        attempt: u32,
        /// Wait applied before the next logged rejection
        next_wait: Duration,
    },
}

#[derive(Debug)]
struct RetryState {
    count: u32,
    last_attempt: Instant,
}

/// Exponential per-(ip, key) backoff for viewers of absent publishers
pub struct ViewerRetryBackoff {
    /// Base wait (doubles per logged rejection)
    base: Duration,
    /// Wait ceiling
    cap: Duration,
    /// Idle time after which an entry is purged
    idle_ttl: Duration,
    entries: HashMap<(IpAddr, StreamKey), RetryState>,
}

impl ViewerRetryBackoff {
    /// Create a backoff tracker
    pub fn new(base: Duration, cap: Duration, idle_ttl: Duration) -> Self {
        Self {
            base,
            cap,
            idle_ttl,
            entries: HashMap::new(),
        }
    }

    /// Register a playback rejection for a key with no active publisher
    pub fn register_rejection(
        &mut self,
        ip: IpAddr,
        key: &StreamKey,
        now: Instant,
    ) -> RetryDecision {
        match self.entries.get_mut(&(ip, key.clone())) {
            None => {
                self.entries.insert(
                    (ip, key.clone()),
                    RetryState {
                        count: 0,
                        last_attempt: now,
                    },
                );
                RetryDecision::Logged {
                    attempt: 1,
                    next_wait: Self::wait_for(self.base, self.cap, 0),
                }
            }
            Some(state) => {
                let wait = Self::wait_for(self.base, self.cap, state.count);
                if now.saturating_duration_since(state.last_attempt) < wait {
                    return RetryDecision::Silent;
                }
                state.count += 1;
                state.last_attempt = now;
                RetryDecision::Logged {
                    attempt: state.count + 1,
                    next_wait: Self::wait_for(self.base, self.cap, state.count),
                }
            }
        }
    }

    /// Drop all entries for a key; returns the affected IPs
    ///
    /// Called when a publisher attaches so waiting viewers reconnect
    /// without delay. The returned IPs also get their rate-limiter
    /// windows cleared by the caller.
    pub fn clear_key(&mut self, key: &StreamKey) -> Vec<IpAddr> {
        let mut ips = Vec::new();
        self.entries.retain(|(ip, k), _| {
            if k == key {
                if !ips.contains(ip) {
                    ips.push(*ip);
                }
                false
            } else {
                true
            }
        });
        ips
    }

    /// Purge entries idle longer than the TTL
    pub fn purge(&mut self, now: Instant) {
        let ttl = self.idle_ttl;
        self.entries
            .retain(|_, state| now.saturating_duration_since(state.last_attempt) < ttl);
    }

    /// Number of tracked (ip, key) pairs
    pub fn tracked_entries(&self) -> usize {
        self.entries.len()
    }

    /// wait = min(base * 2^count, cap)
    fn wait_for(base: Duration, cap: Duration, count: u32) -> Duration {
        let factor = 1u32 << count.min(16);
        base.saturating_mul(factor).min(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(198, 51, 100, last))
    }

    fn backoff() -> ViewerRetryBackoff {
        ViewerRetryBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_first_rejection_is_logged() {
        let mut backoff = backoff();
        let key = StreamKey::new("k1");
        let now = Instant::now();

        match backoff.register_rejection(ip(1), &key, now) {
            RetryDecision::Logged { attempt, next_wait } => {
                assert_eq!(attempt, 1);
                assert_eq!(next_wait, Duration::from_secs(1));
            }
            RetryDecision::Silent => panic!("first rejection must be logged"),
        }
    }

    #[test]
    fn test_early_retry_is_silent_and_does_not_mutate() {
        let mut backoff = backoff();
        let key = StreamKey::new("k1");
        let now = Instant::now();

        backoff.register_rejection(ip(1), &key, now);

        // Inside the 1s wait: silent, counter untouched
        let early = now + Duration::from_millis(500);
        assert_eq!(
            backoff.register_rejection(ip(1), &key, early),
            RetryDecision::Silent
        );

        // Past the original wait: counter advances, wait doubles
        let late = now + Duration::from_secs(1);
        assert_eq!(
            backoff.register_rejection(ip(1), &key, late),
            RetryDecision::Logged {
                attempt: 2,
                next_wait: Duration::from_secs(2),
            }
        );
    }

    #[test]
    fn test_wait_is_capped() {
        let mut backoff = backoff();
        let key = StreamKey::new("k1");
        let mut now = Instant::now();

        let mut last_wait = Duration::ZERO;
        for _ in 0..6 {
            if let RetryDecision::Logged { next_wait, .. } =
                backoff.register_rejection(ip(1), &key, now)
            {
                last_wait = next_wait;
            }
            now += Duration::from_secs(10);
        }
        assert_eq!(last_wait, Duration::from_secs(5));
    }

    #[test]
    fn test_clear_key_returns_ips() {
        let mut backoff = backoff();
        let k1 = StreamKey::new("k1");
        let k2 = StreamKey::new("k2");
        let now = Instant::now();

        backoff.register_rejection(ip(1), &k1, now);
        backoff.register_rejection(ip(2), &k1, now);
        backoff.register_rejection(ip(3), &k2, now);

        let mut ips = backoff.clear_key(&k1);
        ips.sort();
        assert_eq!(ips, vec![ip(1), ip(2)]);
        assert_eq!(backoff.tracked_entries(), 1);

        // Cleared viewers start over with a fresh logged rejection
        assert!(matches!(
            backoff.register_rejection(ip(1), &k1, now),
            RetryDecision::Logged { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_purge_drops_idle_entries() {
        let mut backoff = backoff();
        let key = StreamKey::new("k1");
        let now = Instant::now();

        backoff.register_rejection(ip(1), &key, now);
        backoff.purge(now + Duration::from_secs(299));
        assert_eq!(backoff.tracked_entries(), 1);

        backoff.purge(now + Duration::from_secs(300));
        assert_eq!(backoff.tracked_entries(), 0);
    }
}
