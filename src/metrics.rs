//! Cognitive-load metrics engine
//!
//! Implements the fixed scoring formula: recent-event frequency over a 60 s
//! window, a frequency-derived latency proxy, idle decay, and a bounded
//! trend history sampled at most once per 5 s. The formula is an explicitly
//! heuristic engagement score, kept bit-for-bit stable for output
//! compatibility, not a validated psychological measure.
//!
//! The full recompute runs on every logged event and is O(buffered events),
//! bounded by the buffer cap. The read path never re-runs the window scan;
//! it only re-applies the idle-decay step against the read instant
//! ([`decayed_load`]), so idle sessions report a falling load without
//! mutating any state.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::store::EventBuffer;
use crate::types::{DecisionVelocity, StressSample};

/// Window defining a "recent" event, in milliseconds.
pub const RECENT_WINDOW_MS: i64 = 60_000;

/// Minimum spacing between consecutive trend samples, in milliseconds.
pub const HISTORY_SPACING_MS: i64 = 5_000;

/// Maximum number of retained trend samples.
pub const MAX_HISTORY_SAMPLES: usize = 50;

/// Idle time (seconds) tolerated before decay kicks in.
const IDLE_GRACE_SEC: f64 = 5.0;

/// Load above which the focus shield engages (strict).
pub const FOCUS_SHIELD_THRESHOLD: u8 = 75;

/// Recompute the cognitive-load score from the event buffer.
///
/// Steps, in order: count events younger than [`RECENT_WINDOW_MS`]; derive
/// the latency proxy `max(0, 100 - 2 * frequency)`; combine as
/// `min(100, 1.5 * frequency + 0.1 * latency)`; apply idle decay; round.
/// Clamped on both ends, so the result is always in 0-100.
pub fn compute_load(
    events: &EventBuffer,
    last_activity: DateTime<Utc>,
    now: DateTime<Utc>,
) -> u8 {
    let frequency = events
        .iter()
        .filter(|e| (now - e.timestamp).num_milliseconds() < RECENT_WINDOW_MS)
        .count() as f64;

    let latency_score = (100.0 - frequency * 2.0).max(0.0);
    let load = (frequency * 1.5 + latency_score * 0.1).min(100.0);

    apply_idle_decay(load, last_activity, now).round() as u8
}

/// Re-apply idle decay to a stored load at read time.
///
/// The write-side recompute runs with `last_activity == now`, so decay never
/// fires there; it only becomes visible on reads after the session has gone
/// quiet.
pub fn decayed_load(stored: u8, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
    apply_idle_decay(f64::from(stored), last_activity, now).round() as u8
}

fn apply_idle_decay(load: f64, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let idle_seconds = (now - last_activity).num_milliseconds() as f64 / 1000.0;
    if idle_seconds > IDLE_GRACE_SEC {
        (load - idle_seconds * 0.5).max(0.0)
    } else {
        load
    }
}

/// Append a trend sample if enough time has passed since the last one.
///
/// A sample is recorded when the history is empty or the previous sample is
/// older than [`HISTORY_SPACING_MS`]; otherwise the load is reported live
/// but not persisted. The history is capped at [`MAX_HISTORY_SAMPLES`],
/// oldest evicted first.
pub fn record_sample(history: &mut VecDeque<StressSample>, load: u8, now: DateTime<Utc>) {
    let due = match history.back() {
        Some(last) => (now - last.timestamp).num_milliseconds() > HISTORY_SPACING_MS,
        None => true,
    };
    if !due {
        return;
    }

    history.push_back(StressSample {
        timestamp: now,
        value: load,
    });
    if history.len() > MAX_HISTORY_SAMPLES {
        history.pop_front();
    }
}

/// Whether the focus shield is engaged for the given load (strictly above
/// [`FOCUS_SHIELD_THRESHOLD`]).
pub fn focus_shield(load: u8) -> bool {
    load > FOCUS_SHIELD_THRESHOLD
}

/// Reason string accompanying the shield state.
pub fn focus_reason(shield_active: bool) -> &'static str {
    if shield_active {
        "Sustained high cognitive load detected."
    } else {
        "System monitoring active."
    }
}

/// Decision-velocity heuristic: the peak hour shifts with the current load
/// via integer floor division. Deterministic by construction; the exact
/// mapping is preserved for output compatibility.
pub fn decision_velocity(load: u8) -> DecisionVelocity {
    let peak_hour = 10 + load / 20;
    DecisionVelocity {
        peak_time: format!("{peak_hour}:00 AM"),
        intensity: f64::from(load) / 100.0,
    }
}
