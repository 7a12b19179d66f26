//! Error types for the broadcast bus

use thiserror::Error;

/// Broadcast bus error
#[derive(Debug, Error)]
pub enum Error {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Publish error
    #[error("Publish error: {0}")]
    Publish(String),

    /// Subscribe error
    #[error("Subscribe error: {0}")]
    Subscribe(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// JetStream error
    #[error("JetStream error: {0}")]
    JetStream(String),

    /// Stream creation failed
    #[error("Stream creation failed: {0}")]
    StreamCreation(String),

    /// Consumer creation failed
    #[error("Consumer creation failed: {0}")]
    Consumer(String),

    /// Operation timed out after the given milliseconds
    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
