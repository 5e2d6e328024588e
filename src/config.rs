//! Relay configuration
//!
//! Every monitoring threshold, admission limit, and tick interval lives here
//! so the numbers are set in one place and handed to each component.

use std::time::Duration;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bitrate below which a publisher is considered critically low (bits/sec)
    pub critical_low_bitrate: u64,

    /// Bitrate below which quality is poor (bits/sec)
    pub poor_quality_bitrate: u64,

    /// Lower bound of the production target range (bits/sec)
    pub target_bitrate_min: u64,

    /// Upper bound of the production target range (bits/sec)
    pub target_bitrate_max: u64,

    /// How long a publisher may stay critically low before disconnection
    pub grace_period: Duration,

    /// Idle time after which a non-live session is reaped
    pub stale_connection_threshold: Duration,

    /// Bitrate/quality monitoring tick interval
    pub monitor_interval: Duration,

    /// Stale reaper tick interval
    pub reap_interval: Duration,

    /// Admission sweep interval (rate-limiter and backoff cleanup)
    pub sweep_interval: Duration,

    /// Maximum playback attempts per IP within the connection window
    pub max_connections_per_ip: usize,

    /// Sliding window for per-IP playback attempt counting
    pub connection_window: Duration,

    /// Minimum elapsed time between accepted bitrate computations
    pub min_sample_interval: Duration,

    /// Maximum retained bitrate samples per publisher
    pub bitrate_history_cap: usize,

    /// Only samples newer than this feed quality classification
    pub quality_window: Duration,

    /// Activity/bitrate window within which a publisher counts as live
    pub publisher_liveness_window: Duration,

    /// Activity window within which a viewer counts as live
    pub viewer_liveness_window: Duration,

    /// Base delay for viewer retry backoff
    pub backoff_base: Duration,

    /// Ceiling for viewer retry backoff
    pub backoff_cap: Duration,

    /// Idle time after which a backoff entry is purged
    pub backoff_idle_ttl: Duration,

    /// Timeout for the transport stats query
    pub stats_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            critical_low_bitrate: 500_000,
            poor_quality_bitrate: 1_000_000,
            target_bitrate_min: 3_000_000,
            target_bitrate_max: 12_000_000,
            grace_period: Duration::from_secs(120),
            stale_connection_threshold: Duration::from_secs(30),
            monitor_interval: Duration::from_secs(5),
            reap_interval: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(60),
            max_connections_per_ip: 240,
            connection_window: Duration::from_secs(60),
            min_sample_interval: Duration::from_secs(2),
            bitrate_history_cap: 60,
            quality_window: Duration::from_secs(60),
            publisher_liveness_window: Duration::from_secs(60),
            viewer_liveness_window: Duration::from_secs(90),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(5),
            backoff_idle_ttl: Duration::from_secs(300),
            stats_timeout: Duration::from_secs(5),
        }
    }
}

impl RelayConfig {
    /// Set the critical low bitrate threshold
    pub fn critical_low_bitrate(mut self, bps: u64) -> Self {
        self.critical_low_bitrate = bps;
        self
    }

    /// Set the poor quality bitrate threshold
    pub fn poor_quality_bitrate(mut self, bps: u64) -> Self {
        self.poor_quality_bitrate = bps;
        self
    }

    /// Set the production target bitrate range
    pub fn target_bitrate_range(mut self, min: u64, max: u64) -> Self {
        self.target_bitrate_min = min;
        self.target_bitrate_max = max;
        self
    }

    /// Set the low-quality grace period
    pub fn grace_period(mut self, period: Duration) -> Self {
        self.grace_period = period;
        self
    }

    /// Set the stale connection threshold
    pub fn stale_connection_threshold(mut self, threshold: Duration) -> Self {
        self.stale_connection_threshold = threshold;
        self
    }

    /// Set the monitoring tick interval
    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Set the reaper tick interval
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Set the admission sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the minimum interval between accepted bitrate computations
    pub fn min_sample_interval(mut self, interval: Duration) -> Self {
        self.min_sample_interval = interval;
        self
    }

    /// Set the maximum retained bitrate samples per publisher
    pub fn bitrate_history_cap(mut self, cap: usize) -> Self {
        self.bitrate_history_cap = cap;
        self
    }

    /// Set the window feeding quality classification
    pub fn quality_window(mut self, window: Duration) -> Self {
        self.quality_window = window;
        self
    }

    /// Set the publisher liveness window
    pub fn publisher_liveness_window(mut self, window: Duration) -> Self {
        self.publisher_liveness_window = window;
        self
    }

    /// Set the viewer liveness window
    pub fn viewer_liveness_window(mut self, window: Duration) -> Self {
        self.viewer_liveness_window = window;
        self
    }

    /// Set the viewer retry backoff base and ceiling
    pub fn retry_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Set the idle TTL for backoff entries
    pub fn backoff_idle_ttl(mut self, ttl: Duration) -> Self {
        self.backoff_idle_ttl = ttl;
        self
    }

    /// Set the per-IP playback attempt limit
    pub fn max_connections_per_ip(mut self, max: usize) -> Self {
        self.max_connections_per_ip = max;
        self
    }

    /// Set the per-IP attempt counting window
    pub fn connection_window(mut self, window: Duration) -> Self {
        self.connection_window = window;
        self
    }

    /// Set the stats query timeout
    pub fn stats_timeout(mut self, timeout: Duration) -> Self {
        self.stats_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.critical_low_bitrate, 500_000);
        assert_eq!(config.poor_quality_bitrate, 1_000_000);
        assert_eq!(config.target_bitrate_min, 3_000_000);
        assert_eq!(config.target_bitrate_max, 12_000_000);
        assert_eq!(config.grace_period, Duration::from_secs(120));
        assert_eq!(config.stale_connection_threshold, Duration::from_secs(30));
        assert_eq!(config.max_connections_per_ip, 240);
        assert_eq!(config.connection_window, Duration::from_secs(60));
        assert_eq!(config.bitrate_history_cap, 60);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::default()
            .critical_low_bitrate(250_000)
            .poor_quality_bitrate(800_000)
            .target_bitrate_range(2_000_000, 8_000_000)
            .grace_period(Duration::from_secs(60))
            .stale_connection_threshold(Duration::from_secs(10))
            .max_connections_per_ip(3)
            .connection_window(Duration::from_secs(30));

        assert_eq!(config.critical_low_bitrate, 250_000);
        assert_eq!(config.poor_quality_bitrate, 800_000);
        assert_eq!(config.target_bitrate_min, 2_000_000);
        assert_eq!(config.target_bitrate_max, 8_000_000);
        assert_eq!(config.grace_period, Duration::from_secs(60));
        assert_eq!(config.stale_connection_threshold, Duration::from_secs(10));
        assert_eq!(config.max_connections_per_ip, 3);
        assert_eq!(config.connection_window, Duration::from_secs(30));
    }

    #[test]
    fn test_every_field_has_a_setter() {
        let config = RelayConfig::default()
            .critical_low_bitrate(250_000)
            .poor_quality_bitrate(800_000)
            .target_bitrate_range(2_000_000, 8_000_000)
            .grace_period(Duration::from_secs(60))
            .stale_connection_threshold(Duration::from_secs(10))
            .monitor_interval(Duration::from_secs(2))
            .reap_interval(Duration::from_secs(7))
            .sweep_interval(Duration::from_secs(120))
            .max_connections_per_ip(3)
            .connection_window(Duration::from_secs(30))
            .min_sample_interval(Duration::from_secs(1))
            .bitrate_history_cap(10)
            .quality_window(Duration::from_secs(45))
            .publisher_liveness_window(Duration::from_secs(40))
            .viewer_liveness_window(Duration::from_secs(50))
            .retry_backoff(Duration::from_millis(500), Duration::from_secs(8))
            .backoff_idle_ttl(Duration::from_secs(600))
            .stats_timeout(Duration::from_secs(3));

        assert_eq!(config.sweep_interval, Duration::from_secs(120));
        assert_eq!(config.min_sample_interval, Duration::from_secs(1));
        assert_eq!(config.bitrate_history_cap, 10);
        assert_eq!(config.quality_window, Duration::from_secs(45));
        assert_eq!(config.publisher_liveness_window, Duration::from_secs(40));
        assert_eq!(config.viewer_liveness_window, Duration::from_secs(50));
        assert_eq!(config.backoff_base, Duration::from_millis(500));
        assert_eq!(config.backoff_cap, Duration::from_secs(8));
        assert_eq!(config.backoff_idle_ttl, Duration::from_secs(600));
        assert_eq!(config.stats_timeout, Duration::from_secs(3));
    }
}
