//! Submission error taxonomy, mirrored from the server

use thiserror::Error;

/// Why the server (or the transport to it) rejected a submission.
///
/// The queue treats every variant the same way: halt and retry on the
/// next reconnect cycle. It surfaces the kind so the scorer can
/// resolve validation and conflict rejections explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The server rejected the input before any state change
    #[error("validation rejected: {0}")]
    Validation(String),

    /// A gate or rule conflict; an explicit resolving action is needed
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unknown match or player reference
    #[error("not found: {0}")]
    NotFound(String),

    /// The submission never reached the server
    #[error("transport failure: {0}")]
    Transport(String),
}

impl SubmitError {
    /// True when the server definitely saw and rejected the submission
    /// (as opposed to the transport failing before it arrived)
    pub fn is_rejection(&self) -> bool {
        !matches!(self, SubmitError::Transport(_))
    }
}

/// Result type for submissions
pub type Result<T> = std::result::Result<T, SubmitError>;
