//! Stream quality classification
//!
//! Classifies a publisher's recent throughput against configured
//! thresholds and decides whether to do nothing, warn, or disconnect.
//! Only sustained critically-low throughput ever leads to a disconnect
//! here; silence is the stale reaper's problem, not quality's.

use std::time::Instant;

use crate::config::RelayConfig;
use crate::registry::Session;

/// Reason attached to a quality-triggered disconnect
pub const LOW_BITRATE_REASON: &str = "low bitrate detected";

/// Quality classification of a publisher's recent throughput
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityStatus {
    /// Both current and average below the critical threshold
    Critical,
    /// Current below the poor threshold
    Poor,
    /// Current below the production target range
    BelowTarget,
    /// Current within the production target range
    Excellent,
    /// Current above the production target range
    High,
    /// No bitrate samples within the quality window
    Stale,
}

/// Action the monitoring loop should take for a publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityAction {
    /// Healthy; nothing to do
    None,
    /// Out of the target range but not harmful; keep watching
    Monitor,
    /// Degraded; log a warning
    Warn,
    /// Grace period exhausted; terminate the publisher
    Disconnect,
}

/// Derived quality verdict for one publisher at one tick
#[derive(Debug, Clone)]
pub struct QualityAssessment {
    /// Classification of recent throughput
    pub status: QualityStatus,
    /// What the monitoring loop should do
    pub action: QualityAction,
    /// Human-readable summary for logs and notifications
    pub message: String,
    /// Newest in-window sample (bits/sec)
    pub current_bps: u64,
    /// Mean of in-window samples (bits/sec)
    pub average_bps: u64,
}

/// Classifies publisher throughput and tracks low-quality grace periods
pub struct QualityMonitor {
    config: RelayConfig,
}

impl QualityMonitor {
    /// Create a monitor from the relay configuration
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Assess a publisher's quality at `now`
    ///
    /// Mutates `low_quality_start` on the session: set when critical
    /// throughput is first seen, cleared once current recovers to at least
    /// the poor threshold.
    pub fn assess(&self, session: &mut Session, now: Instant) -> QualityAssessment {
        let window = self.config.quality_window;
        let recent: Vec<u64> = session
            .bitrate_history
            .iter()
            .filter(|s| now.saturating_duration_since(s.at) < window)
            .map(|s| s.bits_per_sec)
            .collect();

        if recent.is_empty() {
            return QualityAssessment {
                status: QualityStatus::Stale,
                action: QualityAction::Monitor,
                message: "no recent bitrate samples".to_string(),
                current_bps: 0,
                average_bps: 0,
            };
        }

        let current = *recent.last().unwrap_or(&0);
        let average = recent.iter().sum::<u64>() / recent.len() as u64;

        if current >= self.config.poor_quality_bitrate {
            session.low_quality_start = None;
        }

        if current < self.config.critical_low_bitrate && average < self.config.critical_low_bitrate
        {
            let started = *session.low_quality_start.get_or_insert(now);
            if now.saturating_duration_since(started) > self.config.grace_period {
                return QualityAssessment {
                    status: QualityStatus::Critical,
                    action: QualityAction::Disconnect,
                    message: LOW_BITRATE_REASON.to_string(),
                    current_bps: current,
                    average_bps: average,
                };
            }
            return QualityAssessment {
                status: QualityStatus::Critical,
                action: QualityAction::Warn,
                message: "critically low bitrate".to_string(),
                current_bps: current,
                average_bps: average,
            };
        }

        let (status, action, message) = if current < self.config.poor_quality_bitrate {
            (QualityStatus::Poor, QualityAction::Warn, "poor bitrate")
        } else if current < self.config.target_bitrate_min {
            (
                QualityStatus::BelowTarget,
                QualityAction::Monitor,
                "below production target",
            )
        } else if current <= self.config.target_bitrate_max {
            (
                QualityStatus::Excellent,
                QualityAction::None,
                "within production target",
            )
        } else {
            (
                QualityStatus::High,
                QualityAction::Monitor,
                "above production target",
            )
        };

        QualityAssessment {
            status,
            action,
            message: message.to_string(),
            current_bps: current,
            average_bps: average,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BitrateSample;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn monitor() -> QualityMonitor {
        QualityMonitor::new(&RelayConfig::default())
    }

    fn session() -> Session {
        Session::new(1, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)), Instant::now())
    }

    fn push(session: &mut Session, at: Instant, bps: u64) {
        session.bitrate_history.push_back(BitrateSample {
            at,
            bits_per_sec: bps,
        });
    }

    #[test]
    fn test_no_recent_samples_is_stale_not_disconnect() {
        let monitor = monitor();
        let mut s = session();
        let now = Instant::now();

        // Old sample outside the 60s window
        push(&mut s, now - Duration::from_secs(120), 5_000_000);

        let a = monitor.assess(&mut s, now);
        assert_eq!(a.status, QualityStatus::Stale);
        assert_eq!(a.action, QualityAction::Monitor);
        assert_eq!(a.current_bps, 0);
    }

    #[test]
    fn test_classification_bands() {
        let monitor = monitor();
        let now = Instant::now();

        let cases = [
            (800_000u64, QualityStatus::Poor, QualityAction::Warn),
            (2_000_000, QualityStatus::BelowTarget, QualityAction::Monitor),
            (6_000_000, QualityStatus::Excellent, QualityAction::None),
            (12_000_000, QualityStatus::Excellent, QualityAction::None),
            (15_000_000, QualityStatus::High, QualityAction::Monitor),
        ];

        for (bps, status, action) in cases {
            let mut s = session();
            push(&mut s, now, bps);
            let a = monitor.assess(&mut s, now);
            assert_eq!(a.status, status, "bps={}", bps);
            assert_eq!(a.action, action, "bps={}", bps);
        }
    }

    #[test]
    fn test_critical_starts_grace_period_and_warns() {
        let monitor = monitor();
        let mut s = session();
        let now = Instant::now();

        push(&mut s, now, 300_000);
        let a = monitor.assess(&mut s, now);

        assert_eq!(a.status, QualityStatus::Critical);
        assert_eq!(a.action, QualityAction::Warn);
        assert_eq!(s.low_quality_start, Some(now));
    }

    #[test]
    fn test_grace_period_exhaustion_disconnects() {
        let monitor = monitor();
        let mut s = session();
        let start = Instant::now();

        push(&mut s, start, 300_000);
        monitor.assess(&mut s, start);

        // Still critical two minutes later
        let later = start + Duration::from_secs(121);
        s.bitrate_history.clear();
        push(&mut s, later, 300_000);

        let a = monitor.assess(&mut s, later);
        assert_eq!(a.action, QualityAction::Disconnect);
        assert_eq!(a.message, LOW_BITRATE_REASON);
    }

    #[test]
    fn test_exactly_at_grace_period_still_warns() {
        let monitor = monitor();
        let mut s = session();
        let start = Instant::now();

        push(&mut s, start, 300_000);
        monitor.assess(&mut s, start);

        let at_boundary = start + Duration::from_secs(120);
        s.bitrate_history.clear();
        push(&mut s, at_boundary, 300_000);

        let a = monitor.assess(&mut s, at_boundary);
        assert_eq!(a.action, QualityAction::Warn);
    }

    #[test]
    fn test_recovery_resets_low_quality_timer() {
        let monitor = monitor();
        let mut s = session();
        let start = Instant::now();

        push(&mut s, start, 300_000);
        monitor.assess(&mut s, start);
        assert!(s.low_quality_start.is_some());

        // Recovers above the poor threshold before the grace period elapses
        let recovered = start + Duration::from_secs(60);
        push(&mut s, recovered, 1_500_000);
        let a = monitor.assess(&mut s, recovered);
        assert!(s.low_quality_start.is_none());
        assert_ne!(a.action, QualityAction::Disconnect);

        // Dropping low again starts a fresh grace period
        let low_again = start + Duration::from_secs(90);
        s.bitrate_history.clear();
        push(&mut s, low_again, 300_000);
        monitor.assess(&mut s, low_again);
        assert_eq!(s.low_quality_start, Some(low_again));

        // 121s after the *new* start it would disconnect; before that it warns
        let before_new_deadline = low_again + Duration::from_secs(100);
        s.bitrate_history.clear();
        push(&mut s, before_new_deadline, 300_000);
        let a = monitor.assess(&mut s, before_new_deadline);
        assert_eq!(a.action, QualityAction::Warn);
    }

    #[test]
    fn test_critical_requires_both_current_and_average_low() {
        let monitor = monitor();
        let mut s = session();
        let now = Instant::now();

        // Average is healthy even though the newest sample dipped
        push(&mut s, now, 4_000_000);
        push(&mut s, now, 4_000_000);
        push(&mut s, now, 300_000);

        let a = monitor.assess(&mut s, now);
        // Current dipped below critical but the average holds it at Poor
        assert_eq!(a.status, QualityStatus::Poor);
        assert_eq!(a.action, QualityAction::Warn);
        assert!(s.low_quality_start.is_none());
    }
}
