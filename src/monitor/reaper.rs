//! Stale session detection
//!
//! Backstop for connections whose clean disconnect event never fires:
//! encoder crashes, pulled cables, NAT timeouts. A session is reaped when
//! its liveness signals lapse AND it has idled past the stale threshold.
//! The liveness window is role-specific: publishers are expected to push
//! data constantly (60s, activity or a fresh bitrate sample), viewers get
//! a longer leash (90s, activity only).

use std::time::Instant;

use crate::config::RelayConfig;
use crate::registry::{Session, SessionRole};

/// Reason attached to a stale-session disconnect
pub const CONNECTION_LOST_REASON: &str = "connection lost";

/// Verdict for one session during a reaper pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapVerdict {
    /// Session shows life; leave it alone
    Keep,
    /// Liveness lapsed and the idle threshold passed; evict
    Evict,
}

/// Decides which sessions the periodic sweep should evict
pub struct StaleReaper {
    config: RelayConfig,
}

impl StaleReaper {
    /// Create a reaper from the relay configuration
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Whether the session is actively streaming right now
    ///
    /// `transport_alive` is the transport's report of a live readable and
    /// writable connection; a dead socket fails liveness outright.
    pub fn is_actively_streaming(
        &self,
        session: &Session,
        transport_alive: bool,
        now: Instant,
    ) -> bool {
        if !transport_alive {
            return false;
        }

        let idle = session.idle_for(now);
        match session.role {
            SessionRole::Publisher => {
                if idle < self.config.publisher_liveness_window {
                    return true;
                }
                session
                    .last_sample_at()
                    .map(|at| {
                        now.saturating_duration_since(at) < self.config.publisher_liveness_window
                    })
                    .unwrap_or(false)
            }
            SessionRole::Viewer => idle < self.config.viewer_liveness_window,
            // Provisional rows carry no streaming signals; only the idle
            // threshold below decides their fate.
            SessionRole::Provisional => false,
        }
    }

    /// Verdict for one session
    pub fn verdict(&self, session: &Session, transport_alive: bool, now: Instant) -> ReapVerdict {
        if self.is_actively_streaming(session, transport_alive, now) {
            return ReapVerdict::Keep;
        }
        if session.idle_for(now) > self.config.stale_connection_threshold {
            ReapVerdict::Evict
        } else {
            ReapVerdict::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BitrateSample, StreamKey};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn reaper() -> StaleReaper {
        StaleReaper::new(&RelayConfig::default())
    }

    fn session_at(now: Instant) -> Session {
        Session::new(1, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)), now)
    }

    #[test]
    fn test_recent_activity_is_never_reaped() {
        let reaper = reaper();
        let now = Instant::now();
        let mut s = session_at(now - Duration::from_secs(3600));
        s.promote_publisher(StreamKey::new("k1"), now - Duration::from_secs(3600));

        // Connection is old but active five seconds ago
        s.last_activity = now - Duration::from_secs(5);

        assert_eq!(reaper.verdict(&s, true, now), ReapVerdict::Keep);
        // Even over a dead socket, the idle threshold hasn't passed
        assert_eq!(reaper.verdict(&s, false, now), ReapVerdict::Keep);
    }

    #[test]
    fn test_idle_dead_socket_is_evicted() {
        let reaper = reaper();
        let now = Instant::now();
        let start = now - Duration::from_secs(120);
        let mut s = session_at(start);
        s.promote_publisher(StreamKey::new("k1"), start);
        s.last_activity = now - Duration::from_secs(31);

        assert_eq!(reaper.verdict(&s, false, now), ReapVerdict::Evict);
    }

    #[test]
    fn test_publisher_kept_alive_by_recent_bitrate_sample() {
        let reaper = reaper();
        let now = Instant::now();
        let start = now - Duration::from_secs(600);
        let mut s = session_at(start);
        s.promote_publisher(StreamKey::new("k1"), start);

        // Activity lapsed past both windows, but the estimator sampled recently
        s.last_activity = now - Duration::from_secs(70);
        s.bitrate_history.push_back(BitrateSample {
            at: now - Duration::from_secs(10),
            bits_per_sec: 4_000_000,
        });

        assert_eq!(reaper.verdict(&s, true, now), ReapVerdict::Keep);

        // A dead socket overrides the sample signal
        assert_eq!(reaper.verdict(&s, false, now), ReapVerdict::Evict);
    }

    #[test]
    fn test_viewer_window_is_longer() {
        let reaper = reaper();
        let now = Instant::now();
        let start = now - Duration::from_secs(600);
        let mut s = session_at(start);
        s.promote_viewer(StreamKey::new("k1"), start);

        // 70s idle: past the publisher window but inside the viewer window
        s.last_activity = now - Duration::from_secs(70);
        assert_eq!(reaper.verdict(&s, true, now), ReapVerdict::Keep);

        // 95s idle: past the viewer window and the stale threshold
        s.last_activity = now - Duration::from_secs(95);
        assert_eq!(reaper.verdict(&s, true, now), ReapVerdict::Evict);
    }

    #[test]
    fn test_provisional_rows_age_out() {
        let reaper = reaper();
        let now = Instant::now();
        let start = now - Duration::from_secs(31);
        let s = session_at(start);

        assert_eq!(reaper.verdict(&s, true, now), ReapVerdict::Evict);

        let fresh = session_at(now - Duration::from_secs(5));
        assert_eq!(reaper.verdict(&fresh, true, now), ReapVerdict::Keep);
    }
}
