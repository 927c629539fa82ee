//! Error types for the audit invoker.

use thiserror::Error;

/// Terminal failure modes of a single audit attempt.
///
/// None of these are retried by the invoker; a failed audit stays failed
/// until a new audit is explicitly requested.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The audit engine could not be reached or answered with a server-side
    /// or rate-limit error.
    #[error("Audit engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The audit did not complete within the configured bound.
    #[error("Audit timed out after {0} seconds")]
    Timeout(u64),

    /// The audit engine refused to analyze the target.
    #[error("Audit request was blocked by the engine: {0}")]
    Blocked(String),

    /// The engine answered, but the response did not contain a usable report.
    #[error("Audit engine returned a malformed response: {0}")]
    MalformedResponse(String),
}
