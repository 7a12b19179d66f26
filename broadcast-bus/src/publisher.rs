//! Match event publisher with retry logic
//!
//! Publishing retries with exponential backoff, but always on the bus
//! task: the fire-and-forget path hands the envelope to a spawned task
//! so a slow or disconnected transport never blocks scoring.

use crate::{
    client::BusClient,
    message::Envelope,
    metrics::{BROADCAST_PUBLISH_DURATION, BROADCAST_PUBLISH_TOTAL},
    Error, Result,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Enable JetStream persistence (acknowledged publishes)
    pub use_jetstream: bool,

    /// Publish timeout
    pub publish_timeout: Duration,

    /// Max retry attempts
    pub max_retry_attempts: u32,

    /// Initial retry delay
    pub initial_retry_delay: Duration,

    /// Max retry delay
    pub max_retry_delay: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            use_jetstream: true,
            publish_timeout: Duration::from_secs(5),
            max_retry_attempts: 3,
            initial_retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(2),
        }
    }
}

/// Match event publisher
pub struct Publisher {
    client: Arc<BusClient>,
    config: PublisherConfig,
}

impl Publisher {
    /// Create new publisher
    pub fn new(client: Arc<BusClient>, config: PublisherConfig) -> Self {
        Self { client, config }
    }

    /// Publish one envelope to its match channel
    pub async fn publish(&self, envelope: &Envelope) -> Result<()> {
        let start = Instant::now();
        let subject = envelope.subject();

        debug!(
            envelope_id = %envelope.id,
            seq = envelope.seq,
            "publishing match event to {}",
            subject
        );

        let payload = envelope.to_bytes()?;
        let result = self.publish_with_retry(&subject, &payload).await;

        let duration = start.elapsed().as_secs_f64();
        BROADCAST_PUBLISH_DURATION
            .with_label_values(&[envelope.kind.subject_suffix()])
            .observe(duration);

        let status = if result.is_ok() { "success" } else { "error" };
        BROADCAST_PUBLISH_TOTAL
            .with_label_values(&[envelope.kind.subject_suffix(), status])
            .inc();

        result
    }

    /// Fire-and-forget publish: hand off to a task and return at once.
    ///
    /// Failures are logged and counted; a viewer that missed the event
    /// reconciles from the next one or from a full snapshot.
    pub fn spawn_publish(self: &Arc<Self>, envelope: Envelope) {
        let publisher = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = publisher.publish(&envelope).await {
                error!(envelope_id = %envelope.id, "broadcast publish failed: {}", e);
            }
        });
    }

    /// Publish with exponential backoff retry
    async fn publish_with_retry(&self, subject: &str, payload: &[u8]) -> Result<()> {
        let mut attempts = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            attempts += 1;

            match self.publish_once(subject, payload).await {
                Ok(_) => {
                    if attempts > 1 {
                        debug!("event published after {} attempts", attempts);
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempts >= self.config.max_retry_attempts {
                        error!("failed to publish after {} attempts: {}", attempts, e);
                        return Err(e);
                    }

                    warn!(
                        "publish failed (attempt {}), retrying in {:?}: {}",
                        attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;

                    // Exponential backoff
                    delay = (delay * 2).min(self.config.max_retry_delay);
                }
            }
        }
    }

    /// Single publish attempt
    async fn publish_once(&self, subject: &str, payload: &[u8]) -> Result<()> {
        if self.config.use_jetstream {
            // Acknowledged publish through JetStream
            let js = self.client.jetstream().await?;
            self.client.ensure_stream().await?;

            let ack = tokio::time::timeout(
                self.config.publish_timeout,
                js.publish(subject.to_string(), bytes::Bytes::copy_from_slice(payload)),
            )
            .await
            .map_err(|_| Error::Timeout(self.config.publish_timeout.as_millis() as u64))?
            .map_err(|e| Error::Publish(e.to_string()))?;

            ack.await
                .map_err(|e| Error::JetStream(format!("Publish ack failed: {}", e)))?;
        } else {
            // Plain publish without persistence
            let client = self.client.client().await?;

            client
                .publish(subject.to_string(), bytes::Bytes::copy_from_slice(payload))
                .await
                .map_err(|e| Error::Publish(e.to_string()))?;

            client
                .flush()
                .await
                .map_err(|e| Error::Publish(format!("Flush failed: {}", e)))?;
        }

        Ok(())
    }
}
