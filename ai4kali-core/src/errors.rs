// ai4kali-core/src/errors.rs
use std::time::Duration;
use thiserror::Error;

/// Failures of a single model invocation.
///
/// The `String` payloads carry the backend's own diagnostic text. It is shown
/// to the user as-is and never inspected for control flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The backend executable or service could not be reached.
    #[error("Model backend not found: {0}")]
    NotFound(String),

    /// No answer arrived before the configured deadline.
    #[error("Model did not answer within {0:?}")]
    Timeout(Duration),

    /// The backend answered but signalled failure (exit status, HTTP status, bad payload).
    #[error("Model backend error: {0}")]
    Backend(String),

    /// The backend's output was not valid UTF-8.
    #[error("Model output could not be decoded: {0}")]
    Decode(String),

    /// The caller abandoned the request (user interrupt).
    #[error("Model request cancelled")]
    Cancelled,
}

/// Errors that escape a gate turn. Everything else is a terminal state, not an error.
#[derive(Error, Debug)]
pub enum GateError {
    /// Error while talking to the user (terminal gone, broken pipe).
    #[error("User Interaction Error: {0}")]
    Ui(#[source] anyhow::Error),

    /// The shell could not be spawned at all.
    #[error("Execution Error: {0}")]
    Exec(#[source] anyhow::Error),
}
