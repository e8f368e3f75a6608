//! Trend-deviation anomaly detector
//!
//! A stateless read-side check: the current load is compared against the
//! arithmetic mean of the session's own trend history. The minimum-history
//! gate prevents false positives on cold-start sessions with too little
//! trend data.

use std::collections::VecDeque;

use crate::types::StressSample;

/// Absolute deviation from the trend mean that counts as irregular.
pub const ANOMALY_THRESHOLD: f64 = 25.0;

/// Minimum history depth before anomalies can be signaled.
pub const MIN_TREND_SAMPLES: usize = 5;

/// Fixed message attached to every detected anomaly.
pub const ANOMALY_MESSAGE: &str = "Detecting irregular interaction variance.";

/// Compare the current load to the session's trend mean.
///
/// Returns the fixed anomaly message when the deviation exceeds
/// [`ANOMALY_THRESHOLD`] and more than [`MIN_TREND_SAMPLES`] samples exist.
/// With an empty history the mean is taken as the current load itself, so
/// no anomaly is possible.
pub fn detect(current_load: u8, history: &VecDeque<StressSample>) -> Option<&'static str> {
    if history.len() <= MIN_TREND_SAMPLES {
        return None;
    }

    let sum: f64 = history.iter().map(|s| f64::from(s.value)).sum();
    let mean = sum / history.len() as f64;

    if (f64::from(current_load) - mean).abs() > ANOMALY_THRESHOLD {
        Some(ANOMALY_MESSAGE)
    } else {
        None
    }
}
