//! Process-wide session registry
//!
//! The registry owns all session state and is the only entry point to it:
//! callers address sessions by id, never by reference, so no state escapes
//! across calls. It is an explicit object rather than a process global;
//! construct one at startup and hand it to every call site (tests get a
//! fresh registry each).
//!
//! Locking is two-level: a map-level `RwLock` for lookup and insertion, and
//! a per-session `Mutex` guarding the append/evict/recompute critical
//! section, so operations on distinct sessions only contend on the brief
//! map lock. No operation blocks on I/O or suspends; everything completes
//! in bounded time.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::anomaly;
use crate::error::TelemetryError;
use crate::insight;
use crate::metrics;
use crate::store::EventBuffer;
use crate::types::{
    EventMeta, Insight, InteractionEvent, LoadStatus, LogOutcome, MetricsReport, StartAck,
    StressSample,
};

/// Per-session telemetry state. Owned exclusively by the registry.
#[derive(Debug)]
struct SessionState {
    started_at: DateTime<Utc>,
    /// Timestamp of the most recent event, or the creation instant while
    /// the buffer is still empty.
    last_activity: DateTime<Utc>,
    events: EventBuffer,
    cognitive_load: u8,
    stress_history: VecDeque<StressSample>,
}

impl SessionState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            last_activity: now,
            events: EventBuffer::new(),
            cognitive_load: 0,
            stress_history: VecDeque::new(),
        }
    }
}

/// Registry mapping session ids to their telemetry state.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionState>>>>,
    instance_id: Uuid,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            instance_id: Uuid::new_v4(),
        }
    }

    /// Unique id of this registry instance, reported as producer metadata.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Register a fresh session under `session_id`.
    ///
    /// Starting an id that already exists overwrites the existing session
    /// and discards its history.
    pub fn start_session(&self, session_id: &str) -> Result<StartAck, TelemetryError> {
        self.start_session_at(session_id, Utc::now())
    }

    /// [`Self::start_session`] with an explicit clock, for deterministic
    /// callers (tests, replay).
    pub fn start_session_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StartAck, TelemetryError> {
        validate_session_id(session_id)?;

        let mut sessions = write_lock(&self.sessions);
        let replaced = sessions
            .insert(
                session_id.to_string(),
                Arc::new(Mutex::new(SessionState::new(now))),
            )
            .is_some();
        drop(sessions);

        if replaced {
            debug!(session_id, "session restarted, prior history discarded");
        } else {
            debug!(session_id, "session started");
        }
        Ok(StartAck::new(session_id))
    }

    /// Log one interaction event and recompute the session's metrics.
    ///
    /// Logging against an unknown session returns `Ok(LogOutcome::Absorbed)`
    /// without creating anything: telemetry is best-effort and must tolerate
    /// sessions that were never started or have expired.
    pub fn log_event(
        &self,
        session_id: &str,
        event_type: &str,
        meta: EventMeta,
    ) -> Result<LogOutcome, TelemetryError> {
        self.log_event_at(session_id, event_type, meta, Utc::now())
    }

    /// [`Self::log_event`] with an explicit clock. The event timestamp is
    /// always the supplied instant, never client-provided.
    pub fn log_event_at(
        &self,
        session_id: &str,
        event_type: &str,
        meta: EventMeta,
        now: DateTime<Utc>,
    ) -> Result<LogOutcome, TelemetryError> {
        validate_session_id(session_id)?;
        if event_type.trim().is_empty() {
            return Err(TelemetryError::InvalidArgument(
                "event type must be a non-empty string".to_string(),
            ));
        }

        let Some(session) = self.lookup(session_id) else {
            trace!(session_id, event_type, "log against unknown session absorbed");
            return Ok(LogOutcome::Absorbed);
        };

        let mut state = lock(&session);
        state.events.push(InteractionEvent::new(event_type, meta, now));
        state.last_activity = now;
        state.cognitive_load = metrics::compute_load(&state.events, state.last_activity, now);
        let load = state.cognitive_load;
        metrics::record_sample(&mut state.stress_history, load, now);

        Ok(LogOutcome::Logged)
    }

    /// Current metrics snapshot plus derived status fields.
    ///
    /// Reads never re-run the window scan and never mutate state; the
    /// stored load is only decayed against the read instant so idle
    /// sessions report a falling score.
    pub fn get_metrics(&self, session_id: &str) -> Result<MetricsReport, TelemetryError> {
        self.get_metrics_at(session_id, Utc::now())
    }

    /// [`Self::get_metrics`] with an explicit clock.
    pub fn get_metrics_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<MetricsReport, TelemetryError> {
        validate_session_id(session_id)?;
        let session = self
            .lookup(session_id)
            .ok_or_else(|| TelemetryError::SessionNotFound(session_id.to_string()))?;
        let state = lock(&session);

        let load = metrics::decayed_load(state.cognitive_load, state.last_activity, now);
        let shield = metrics::focus_shield(load);

        Ok(MetricsReport {
            cognitive_load: load,
            status: LoadStatus::from_load(load),
            stress_trends: state.stress_history.iter().copied().collect(),
            decision_velocity: metrics::decision_velocity(load),
            anomaly: anomaly::detect(load, &state.stress_history).map(String::from),
            focus_shield: shield,
            focus_reason: metrics::focus_reason(shield).to_string(),
        })
    }

    /// Textual insight for the session's current metrics.
    ///
    /// Unknown sessions are a structured `SessionNotFound` here too, same
    /// as the metrics read path.
    pub fn generate_insight(&self, session_id: &str) -> Result<Insight, TelemetryError> {
        self.generate_insight_at(session_id, Utc::now())
    }

    /// [`Self::generate_insight`] with an explicit clock.
    pub fn generate_insight_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Insight, TelemetryError> {
        validate_session_id(session_id)?;
        let session = self
            .lookup(session_id)
            .ok_or_else(|| TelemetryError::SessionNotFound(session_id.to_string()))?;
        let state = lock(&session);

        let load = metrics::decayed_load(state.cognitive_load, state.last_activity, now);
        Ok(insight::generate(load, state.events.len()))
    }

    pub fn contains_session(&self, session_id: &str) -> bool {
        read_lock(&self.sessions).contains_key(session_id)
    }

    pub fn session_count(&self) -> usize {
        read_lock(&self.sessions).len()
    }

    /// Creation instant of a session, if it exists.
    pub fn session_started_at(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.lookup(session_id).map(|s| lock(&s).started_at)
    }

    /// Instant of the session's most recent event (its creation instant if
    /// nothing was logged yet). An external idle reaper can evict on this.
    pub fn last_activity(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.lookup(session_id).map(|s| lock(&s).last_activity)
    }

    fn lookup(&self, session_id: &str) -> Option<Arc<Mutex<SessionState>>> {
        read_lock(&self.sessions).get(session_id).cloned()
    }
}

fn validate_session_id(session_id: &str) -> Result<(), TelemetryError> {
    if session_id.trim().is_empty() {
        return Err(TelemetryError::InvalidArgument(
            "session id must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

// Lock poisoning is recovered rather than propagated: every mutation either
// fully applies before unlock or the call returned early, so the guarded
// state is consistent even after a panicking holder.

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock<T>(rwlock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(rwlock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InsightConfidence;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_start_rejects_empty_id() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.start_session(""),
            Err(TelemetryError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.start_session("   "),
            Err(TelemetryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_start_acknowledges_id() {
        let registry = SessionRegistry::new();
        let ack = registry.start_session("s1").unwrap();
        assert_eq!(ack.status, "started");
        assert_eq!(ack.session_id, "s1");
        assert!(registry.contains_session("s1"));
    }

    #[test]
    fn test_fresh_session_reports_zeroed_metrics() {
        let registry = SessionRegistry::new();
        let now = base_time();
        registry.start_session_at("s1", now).unwrap();

        let report = registry.get_metrics_at("s1", now).unwrap();
        assert_eq!(report.cognitive_load, 0);
        assert_eq!(report.status, LoadStatus::Optimal);
        assert!(report.stress_trends.is_empty());
        assert_eq!(report.anomaly, None);
        assert!(!report.focus_shield);
        assert_eq!(report.decision_velocity.peak_time, "10:00 AM");
    }

    #[test]
    fn test_burst_of_fifty_clicks() {
        let registry = SessionRegistry::new();
        let start = base_time();
        registry.start_session_at("s1", start).unwrap();

        for n in 0..50 {
            let at = start + Duration::milliseconds(n * 20);
            registry
                .log_event_at("s1", "click", EventMeta::new(), at)
                .unwrap();
        }

        let read_at = start + Duration::seconds(1);
        let report = registry.get_metrics_at("s1", read_at).unwrap();
        // frequency 50 -> latency 0 -> load 75
        assert_eq!(report.cognitive_load, 75);
        assert_eq!(report.status, LoadStatus::High);
        // Shield threshold is strictly above 75
        assert!(!report.focus_shield);
        assert_eq!(report.focus_reason, "System monitoring active.");
    }

    #[test]
    fn test_idle_decay_visible_on_read() {
        let registry = SessionRegistry::new();
        let start = base_time();
        registry.start_session_at("s1", start).unwrap();
        for n in 0..50 {
            registry
                .log_event_at("s1", "click", EventMeta::new(), start + Duration::milliseconds(n))
                .unwrap();
        }

        let fresh = registry.get_metrics_at("s1", start).unwrap();
        assert_eq!(fresh.cognitive_load, 75);

        // 60 s idle: 75 - 30 = 45, banded down to MODERATE.
        let idle = registry
            .get_metrics_at("s1", start + Duration::seconds(60))
            .unwrap();
        assert_eq!(idle.cognitive_load, 45);
        assert_eq!(idle.status, LoadStatus::Moderate);
    }

    #[test]
    fn test_metrics_for_unknown_session() {
        let registry = SessionRegistry::new();
        assert_eq!(
            registry.get_metrics("ghost"),
            Err(TelemetryError::SessionNotFound("ghost".to_string()))
        );
    }

    #[test]
    fn test_insight_for_unknown_session() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.generate_insight("ghost"),
            Err(TelemetryError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_log_against_unknown_session_is_absorbed() {
        let registry = SessionRegistry::new();
        let outcome = registry
            .log_event("ghost", "click", EventMeta::new())
            .unwrap();
        assert_eq!(outcome, LogOutcome::Absorbed);
        // No implicit session creation.
        assert!(!registry.contains_session("ghost"));
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn test_log_rejects_empty_event_type() {
        let registry = SessionRegistry::new();
        registry.start_session("s1").unwrap();
        assert!(matches!(
            registry.log_event("s1", "", EventMeta::new()),
            Err(TelemetryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_restart_discards_history() {
        let registry = SessionRegistry::new();
        let start = base_time();
        registry.start_session_at("s1", start).unwrap();
        for n in 0..20 {
            registry
                .log_event_at("s1", "click", EventMeta::new(), start + Duration::seconds(n * 6))
                .unwrap();
        }
        assert!(!registry
            .get_metrics_at("s1", start + Duration::seconds(120))
            .unwrap()
            .stress_trends
            .is_empty());

        let restart = start + Duration::seconds(200);
        registry.start_session_at("s1", restart).unwrap();
        let report = registry.get_metrics_at("s1", restart).unwrap();
        assert_eq!(report.cognitive_load, 0);
        assert!(report.stress_trends.is_empty());
        assert_eq!(registry.session_started_at("s1"), Some(restart));
    }

    #[test]
    fn test_trend_samples_respect_spacing() {
        let registry = SessionRegistry::new();
        let start = base_time();
        registry.start_session_at("s1", start).unwrap();

        // One event per second for 30 s: samples only land every > 5 s.
        for n in 0..30 {
            registry
                .log_event_at("s1", "keydown", EventMeta::new(), start + Duration::seconds(n))
                .unwrap();
        }

        let report = registry
            .get_metrics_at("s1", start + Duration::seconds(30))
            .unwrap();
        let trends = &report.stress_trends;
        assert!(!trends.is_empty());
        assert!(trends.len() <= 30);
        for pair in trends.windows(2) {
            let gap = (pair[1].timestamp - pair[0].timestamp).num_milliseconds();
            assert!(gap >= 5_000, "samples {gap} ms apart");
        }
    }

    #[test]
    fn test_anomaly_flagged_after_burst() {
        let registry = SessionRegistry::new();
        let start = base_time();
        registry.start_session_at("s1", start).unwrap();

        // Slow trickle builds a low-load trend with > 5 samples.
        for n in 0..8 {
            registry
                .log_event_at("s1", "click", EventMeta::new(), start + Duration::seconds(n * 6))
                .unwrap();
        }
        let calm = registry
            .get_metrics_at("s1", start + Duration::seconds(43))
            .unwrap();
        assert!(calm.stress_trends.len() > 5);
        assert_eq!(calm.anomaly, None);

        // Burst far above the trend mean.
        for n in 0..80 {
            registry
                .log_event_at(
                    "s1",
                    "click",
                    EventMeta::new(),
                    start + Duration::seconds(43) + Duration::milliseconds(n * 10),
                )
                .unwrap();
        }
        let report = registry
            .get_metrics_at("s1", start + Duration::seconds(44))
            .unwrap();
        assert_eq!(
            report.anomaly.as_deref(),
            Some(anomaly::ANOMALY_MESSAGE)
        );
    }

    #[test]
    fn test_insight_tracks_live_load() {
        let registry = SessionRegistry::new();
        let start = base_time();
        registry.start_session_at("s1", start).unwrap();

        // Below the event floor: pending regardless of load.
        registry
            .log_event_at("s1", "click", EventMeta::new(), start)
            .unwrap();
        let cold = registry.generate_insight_at("s1", start).unwrap();
        assert_eq!(cold.confidence, InsightConfidence::Pending);

        for n in 1..50 {
            registry
                .log_event_at("s1", "click", EventMeta::new(), start + Duration::milliseconds(n))
                .unwrap();
        }
        // Load 75 with 50 events: the engagement branch.
        let engaged = registry.generate_insight_at("s1", start + Duration::seconds(1)).unwrap();
        assert_eq!(engaged.confidence, InsightConfidence::VeryHigh);

        // After a long idle stretch the decayed load falls to the low branch.
        let idle = registry
            .generate_insight_at("s1", start + Duration::seconds(120))
            .unwrap();
        assert_eq!(idle.confidence, InsightConfidence::Moderate);
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = SessionRegistry::new();
        let start = base_time();
        registry.start_session_at("a", start).unwrap();
        registry.start_session_at("b", start).unwrap();

        for n in 0..50 {
            registry
                .log_event_at("a", "click", EventMeta::new(), start + Duration::milliseconds(n))
                .unwrap();
        }

        assert_eq!(registry.get_metrics_at("a", start).unwrap().cognitive_load, 75);
        assert_eq!(registry.get_metrics_at("b", start).unwrap().cognitive_load, 0);
    }

    #[test]
    fn test_concurrent_logging_to_distinct_sessions() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SessionRegistry::new());
        let ids = ["w1", "w2", "w3", "w4"];
        for id in ids {
            registry.start_session(id).unwrap();
        }

        let mut handles = Vec::new();
        for id in ids {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let outcome = registry
                        .log_event(id, "interaction", EventMeta::new())
                        .unwrap();
                    assert_eq!(outcome, LogOutcome::Logged);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.session_count(), 4);
        for id in ids {
            let report = registry.get_metrics(id).unwrap();
            assert!(report.cognitive_load <= 100);
        }
    }
}
