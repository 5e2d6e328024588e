//! Stream health monitoring
//!
//! Pure decision logic for the periodic monitoring ticks: throughput
//! estimation from cumulative byte counters, quality classification with
//! grace-period tracking, and stale-session detection. The lifecycle
//! controller owns the loops and applies the effects these verdicts call
//! for.

pub mod bitrate;
pub mod quality;
pub mod reaper;

pub use bitrate::BitrateEstimator;
pub use quality::{
    QualityAction, QualityAssessment, QualityMonitor, QualityStatus, LOW_BITRATE_REASON,
};
pub use reaper::{ReapVerdict, StaleReaper, CONNECTION_LOST_REASON};
