//! Core data types for the telemetry engine
//!
//! Report-facing types serialize with camelCase field names as consumed by
//! the analytics API (`cognitiveLoad`, `stressTrends`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque event payload. The core never interprets it; it is carried along
/// for downstream consumers only.
pub type EventMeta = HashMap<String, serde_json::Value>;

/// A single timestamped interaction event.
///
/// `event_type` is an open category string ("click", "keydown",
/// "interaction", ...) rather than a closed enum: the core never branches on
/// it semantically, it only counts membership in the recent-events window.
/// The timestamp is server-assigned at ingest, never client-supplied, so
/// client clock skew cannot poison the window calculations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Event category
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque key/value payload
    #[serde(default)]
    pub meta: EventMeta,
    /// Ingest timestamp (server-assigned)
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(
        event_type: impl Into<String>,
        meta: EventMeta,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            meta,
            timestamp,
        }
    }
}

/// One point of the cognitive-load trend history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressSample {
    /// When the sample was recorded
    pub timestamp: DateTime<Utc>,
    /// Cognitive load at that instant (0-100)
    pub value: u8,
}

/// Coarse load banding reported alongside the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    Optimal,
    Moderate,
    High,
}

impl LoadStatus {
    /// Band a load score. Boundaries are inclusive below, exclusive above:
    /// 30 is already MODERATE, 70 is already HIGH.
    pub fn from_load(load: u8) -> Self {
        if load < 30 {
            LoadStatus::Optimal
        } else if load < 70 {
            LoadStatus::Moderate
        } else {
            LoadStatus::High
        }
    }
}

/// Decision-velocity heuristic: a deterministic label derived from the
/// current load, not a measured statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionVelocity {
    /// Heuristic peak-performance label, e.g. "12:00 AM"
    pub peak_time: String,
    /// Load normalized to 0-1
    pub intensity: f64,
}

/// Full metrics snapshot returned by the read path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// Current cognitive load (0-100), with idle decay applied at read time
    pub cognitive_load: u8,
    /// Coarse banding of the current load
    pub status: LoadStatus,
    /// Bounded trend history (at most 50 samples, >= 5 s apart)
    pub stress_trends: Vec<StressSample>,
    /// Heuristic decision-velocity block
    pub decision_velocity: DecisionVelocity,
    /// Anomaly message when the current load deviates from the session's
    /// own trend mean, `null` otherwise
    pub anomaly: Option<String>,
    /// Whether the focus shield is engaged (load strictly above 75)
    pub focus_shield: bool,
    /// Human-readable reason for the shield state
    pub focus_reason: String,
}

/// Confidence label attached to a generated insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightConfidence {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

/// A canned diagnostic insight derived from the current metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Diagnostic message
    pub text: String,
    /// Confidence label
    pub confidence: InsightConfidence,
    /// Contributing factors (absent for the cold-start branch)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<String>,
}

/// Acknowledgement returned by a successful session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAck {
    /// Always "started"
    pub status: String,
    /// The id the session was registered under
    pub session_id: String,
}

impl StartAck {
    pub(crate) fn new(session_id: impl Into<String>) -> Self {
        Self {
            status: "started".to_string(),
            session_id: session_id.into(),
        }
    }
}

/// Outcome of a log call.
///
/// Logging against an unknown session is absorbed rather than rejected: the
/// telemetry path is best-effort by design, but the outcome stays observable
/// so callers and tests can distinguish the two cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutcome {
    /// Event appended and metrics recomputed
    Logged,
    /// No such session; the call was a no-op
    Absorbed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_status_banding() {
        assert_eq!(LoadStatus::from_load(0), LoadStatus::Optimal);
        assert_eq!(LoadStatus::from_load(29), LoadStatus::Optimal);
        assert_eq!(LoadStatus::from_load(30), LoadStatus::Moderate);
        assert_eq!(LoadStatus::from_load(69), LoadStatus::Moderate);
        assert_eq!(LoadStatus::from_load(70), LoadStatus::High);
        assert_eq!(LoadStatus::from_load(100), LoadStatus::High);
    }

    #[test]
    fn test_load_status_serialization() {
        assert_eq!(
            serde_json::to_string(&LoadStatus::Optimal).unwrap(),
            "\"OPTIMAL\""
        );
        assert_eq!(
            serde_json::to_string(&LoadStatus::High).unwrap(),
            "\"HIGH\""
        );
    }

    #[test]
    fn test_confidence_labels() {
        assert_eq!(
            serde_json::to_string(&InsightConfidence::VeryHigh).unwrap(),
            "\"Very High\""
        );
        assert_eq!(
            serde_json::to_string(&InsightConfidence::Pending).unwrap(),
            "\"Pending\""
        );
    }

    #[test]
    fn test_metrics_report_field_names() {
        let report = MetricsReport {
            cognitive_load: 42,
            status: LoadStatus::Moderate,
            stress_trends: vec![],
            decision_velocity: DecisionVelocity {
                peak_time: "12:00 AM".to_string(),
                intensity: 0.42,
            },
            anomaly: None,
            focus_shield: false,
            focus_reason: "System monitoring active.".to_string(),
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cognitiveLoad"], 42);
        assert_eq!(json["status"], "MODERATE");
        assert_eq!(json["decisionVelocity"]["peakTime"], "12:00 AM");
        assert_eq!(json["anomaly"], serde_json::Value::Null);
        assert_eq!(json["focusShield"], false);
    }

    #[test]
    fn test_event_type_field_rename() {
        let event = InteractionEvent::new("click", EventMeta::new(), Utc::now());
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "click");
    }

    #[test]
    fn test_insight_skips_empty_factors() {
        let insight = Insight {
            text: "Awaiting further interaction signals...".to_string(),
            confidence: InsightConfidence::Pending,
            factors: vec![],
        };
        let json: serde_json::Value = serde_json::to_value(&insight).unwrap();
        assert!(json.get("factors").is_none());
    }
}
