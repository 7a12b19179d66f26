//! Error types for the scoring core

use thiserror::Error;

/// Result type for scoring operations
pub type Result<T> = std::result::Result<T, Error>;

/// Scoring core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input or an incompatible dismissal/extra combination.
    /// Rejected before any state change.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Gate violation, consecutive-bowler violation, empty-ledger undo,
    /// or a mutation against a terminal match
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown player reference
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    /// Unknown match reference
    #[error("Match not found: {0}")]
    MatchNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Replay failed mid-way; the ledger can no longer be trusted
    #[error("Ledger corruption: {0}")]
    LedgerCorruption(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors the caller can resolve with an explicit action
    /// (pick a new batter/bowler, reconcile state) and then retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// True for errors rejected before any state change
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
