//! NATS client wrapper with lazy connection and stream management

use crate::{Error, Result, SUBJECT_ROOT};
use async_nats::jetstream::{
    self,
    stream::{Config as StreamConfig, RetentionPolicy, StorageType},
};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

/// NATS connection configuration
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,

    /// JetStream stream holding every match channel
    pub stream_name: String,

    /// Event retention on the stream
    pub max_age: Duration,

    /// Deduplication window
    pub duplicate_window: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            stream_name: "STUMPCAST_MATCH_EVENTS".to_string(),
            max_age: Duration::from_secs(24 * 3600),
            duplicate_window: Duration::from_secs(300),
        }
    }
}

/// Lazily connected NATS client shared by publishers and subscribers
pub struct BusClient {
    config: NatsConfig,
    connection: OnceCell<async_nats::Client>,
}

impl BusClient {
    /// Create new client (does not connect yet)
    pub fn new(config: NatsConfig) -> Self {
        Self {
            config,
            connection: OnceCell::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Get the connection, establishing it on first use
    pub async fn client(&self) -> Result<async_nats::Client> {
        let client = self
            .connection
            .get_or_try_init(|| async {
                info!("Connecting to NATS at {}", self.config.url);
                async_nats::connect(&self.config.url)
                    .await
                    .map_err(|e| Error::Connection(e.to_string()))
            })
            .await?;
        Ok(client.clone())
    }

    /// JetStream context over the connection
    pub async fn jetstream(&self) -> Result<jetstream::Context> {
        Ok(jetstream::new(self.client().await?))
    }

    /// Ensure the match-events stream exists
    pub async fn ensure_stream(&self) -> Result<()> {
        let js = self.jetstream().await?;

        let config = StreamConfig {
            name: self.config.stream_name.clone(),
            description: Some("StumpCast match channel events".to_string()),
            subjects: vec![format!("{}.match.>", SUBJECT_ROOT)],
            retention: RetentionPolicy::Limits,
            max_age: self.config.max_age,
            storage: StorageType::File,
            duplicate_window: self.config.duplicate_window,
            ..Default::default()
        };

        js.get_or_create_stream(config)
            .await
            .map_err(|e| Error::StreamCreation(e.to_string()))?;

        Ok(())
    }
}
