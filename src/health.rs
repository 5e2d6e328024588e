//! Health snapshot for the surrounding layer
//!
//! A read-only view of the registry plus derived per-session throughput
//! fields, serializable for whatever dashboard or status endpoint sits on
//! top of the relay. No protocol logic lives here.

use serde::Serialize;

use crate::config::RelayConfig;

/// Monitoring configuration echoed into the health snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSummary {
    /// Critical low bitrate threshold (bits/sec)
    pub critical_low_bitrate: u64,
    /// Poor quality bitrate threshold (bits/sec)
    pub poor_quality_bitrate: u64,
    /// Production target range lower bound (bits/sec)
    pub target_bitrate_min: u64,
    /// Production target range upper bound (bits/sec)
    pub target_bitrate_max: u64,
    /// Low-quality grace period (ms)
    pub grace_period_ms: u64,
    /// Stale connection threshold (ms)
    pub stale_connection_threshold_ms: u64,
    /// Monitoring tick interval (ms)
    pub monitor_interval_ms: u64,
    /// Playback attempts allowed per IP per window
    pub max_connections_per_ip: usize,
    /// Per-IP attempt window (ms)
    pub connection_window_ms: u64,
}

impl From<&RelayConfig> for MonitorSummary {
    fn from(config: &RelayConfig) -> Self {
        Self {
            critical_low_bitrate: config.critical_low_bitrate,
            poor_quality_bitrate: config.poor_quality_bitrate,
            target_bitrate_min: config.target_bitrate_min,
            target_bitrate_max: config.target_bitrate_max,
            grace_period_ms: config.grace_period.as_millis() as u64,
            stale_connection_threshold_ms: config.stale_connection_threshold.as_millis() as u64,
            monitor_interval_ms: config.monitor_interval.as_millis() as u64,
            max_connections_per_ip: config.max_connections_per_ip,
            connection_window_ms: config.connection_window.as_millis() as u64,
        }
    }
}

/// Derived view of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionHealth {
    /// Transport-assigned session ID
    pub id: u64,
    /// Stream key, if promoted
    pub stream_key: Option<String>,
    /// Remote peer IP
    pub ip: String,
    /// "provisional", "publisher", or "viewer"
    pub role: &'static str,
    /// Seconds since the connection was established
    pub connected_secs: u64,
    /// Seconds since the last activity signal
    pub idle_secs: u64,
    /// Newest bitrate sample (bits/sec)
    pub current_bps: u64,
    /// Mean over the bitrate history (bits/sec)
    pub average_bps: u64,
    /// Maximum over the bitrate history (bits/sec)
    pub peak_bps: u64,
    /// Data packets observed
    pub data_packets: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Whether liveness signals currently hold
    pub actively_streaming: bool,
}

/// Full relay health snapshot
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Number of registered sessions
    pub active_sessions: usize,
    /// Active monitoring configuration
    pub monitor: MonitorSummary,
    /// Per-session derived fields, ordered by session ID
    pub sessions: Vec<SessionHealth>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_summary_from_config() {
        let summary = MonitorSummary::from(&RelayConfig::default());

        assert_eq!(summary.critical_low_bitrate, 500_000);
        assert_eq!(summary.grace_period_ms, 120_000);
        assert_eq!(summary.stale_connection_threshold_ms, 30_000);
        assert_eq!(summary.connection_window_ms, 60_000);
    }
}
