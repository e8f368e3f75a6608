//! Mindpulse - In-process behavioral telemetry engine
//!
//! Mindpulse ingests streams of timestamped interaction events and derives
//! per-session cognitive-load state: a rolling 0-100 score, a bounded trend
//! history, a trend-deviation anomaly flag, and a short natural-language
//! insight.
//!
//! ## Modules
//!
//! - **Session Registry**: process-wide session lifecycle and concurrency
//! - **Event Store**: bounded per-session event buffer
//! - **Metrics Engine**: load scoring, idle decay, trend sampling
//! - **Anomaly Detector**: deviation from the session's own trend mean
//! - **Insight Generator**: canned diagnostics with confidence labels
//!
//! All state is volatile and in-process; there is no durable storage and no
//! cross-process coordination. Every operation is a synchronous, lock-guarded
//! function call.

pub mod anomaly;
pub mod error;
pub mod insight;
pub mod metrics;
pub mod registry;
pub mod store;
pub mod types;

pub use error::TelemetryError;
pub use registry::SessionRegistry;
pub use types::{
    DecisionVelocity, EventMeta, Insight, InsightConfidence, InteractionEvent, LoadStatus,
    LogOutcome, MetricsReport, StartAck, StressSample,
};

/// Engine version embedded in producer metadata
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for summary payloads
pub const PRODUCER_NAME: &str = "mindpulse";
