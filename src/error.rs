//! Error types for Mindpulse

use thiserror::Error;

/// Errors surfaced by the telemetry core.
///
/// The metrics pipeline itself has no fallible step (pure arithmetic over
/// bounded in-memory buffers), so the taxonomy is limited to boundary
/// validation and lookup failures. Nothing is retried; every call either
/// succeeds or returns one of these terminally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    /// A required argument was missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No session is registered under the given id. Surfaced on read paths
    /// only; log calls against unknown sessions are absorbed instead.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}
