//! Per-match channel subscriber
//!
//! Every subscriber of one match converges to the same state: events
//! arrive in mutation order for that match (the per-match actor
//! serializes upstream), and delta payloads merge idempotently so a
//! missed update reconciles from the next.

use crate::{
    client::BusClient,
    message::Envelope,
    metrics::BROADCAST_RECEIVE_TOTAL,
    types::ChannelKey,
    Error, Result,
};
use async_nats::jetstream::{self, consumer};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Handler for incoming match events
#[async_trait]
pub trait MatchEventHandler: Send + Sync {
    /// Handle one envelope from the channel
    async fn handle(&self, envelope: Envelope) -> Result<()>;
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Durable consumer name
    pub durable_name: String,

    /// Acknowledgment wait time
    pub ack_wait: Duration,

    /// Max delivery attempts
    pub max_deliver: i64,

    /// Use JetStream (vs core NATS)
    pub use_jetstream: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            durable_name: "stumpcast-viewer".to_string(),
            ack_wait: Duration::from_secs(30),
            max_deliver: 3,
            use_jetstream: true,
        }
    }
}

/// Subscriber for one match's channel
pub struct Subscriber {
    client: Arc<BusClient>,
    config: SubscriberConfig,
    channel: ChannelKey,
}

impl Subscriber {
    /// Create new subscriber for a match channel
    pub fn new(client: Arc<BusClient>, config: SubscriberConfig, channel: ChannelKey) -> Self {
        Self {
            client,
            config,
            channel,
        }
    }

    /// The channel this subscriber listens on
    pub fn channel(&self) -> ChannelKey {
        self.channel
    }

    /// Subscribe and process events until the stream ends
    pub async fn subscribe<H>(&self, handler: Arc<H>) -> Result<()>
    where
        H: MatchEventHandler + 'static,
    {
        if self.config.use_jetstream {
            self.subscribe_jetstream(handler).await
        } else {
            self.subscribe_core(handler).await
        }
    }

    /// Subscribe using JetStream (durable, acknowledged)
    async fn subscribe_jetstream<H>(&self, handler: Arc<H>) -> Result<()>
    where
        H: MatchEventHandler + 'static,
    {
        self.client.ensure_stream().await?;
        let js = self.client.jetstream().await?;
        let stream_name = self.client.config().stream_name.clone();
        let subject_filter = self.channel.subscription_subject();

        info!(
            "Subscribing to stream {} with filter {}",
            stream_name, subject_filter
        );

        let consumer_config = consumer::pull::Config {
            durable_name: Some(format!(
                "{}-{}",
                self.config.durable_name, self.channel.match_id
            )),
            filter_subject: subject_filter,
            ack_policy: consumer::AckPolicy::Explicit,
            ack_wait: self.config.ack_wait,
            max_deliver: self.config.max_deliver,
            deliver_policy: consumer::DeliverPolicy::All,
            ..Default::default()
        };

        let consumer = js
            .get_stream(stream_name.as_str())
            .await
            .map_err(|e| Error::JetStream(e.to_string()))?
            .create_consumer(consumer_config)
            .await
            .map_err(|e| Error::Consumer(e.to_string()))?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        while let Some(msg) = messages.next().await {
            let msg = msg.map_err(|e| Error::Subscribe(e.to_string()))?;

            match Envelope::from_bytes(&msg.payload) {
                Ok(envelope) => {
                    let kind = envelope.kind.subject_suffix();
                    BROADCAST_RECEIVE_TOTAL
                        .with_label_values(&[kind, "success"])
                        .inc();

                    match handler.handle(envelope).await {
                        Ok(_) => {
                            if let Err(e) = msg.ack().await {
                                error!("Failed to ack event: {}", e);
                            }
                        }
                        Err(e) => {
                            error!("Error handling event: {}", e);
                            // Negative acknowledgment: redelivered later
                            if let Err(nak_err) =
                                msg.ack_with(jetstream::AckKind::Nak(None)).await
                            {
                                error!("Failed to nak event: {}", nak_err);
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to parse envelope: {}", e);
                    BROADCAST_RECEIVE_TOTAL
                        .with_label_values(&["unknown", "parse_error"])
                        .inc();

                    // Terminate bad message (won't be redelivered)
                    if let Err(term_err) = msg.ack_with(jetstream::AckKind::Term).await {
                        error!("Failed to terminate bad event: {}", term_err);
                    }
                }
            }
        }

        Ok(())
    }

    /// Subscribe using core NATS (no persistence)
    async fn subscribe_core<H>(&self, handler: Arc<H>) -> Result<()>
    where
        H: MatchEventHandler + 'static,
    {
        let client = self.client.client().await?;
        let subject = self.channel.subscription_subject();

        info!("Subscribing to core NATS subject: {}", subject);

        let mut subscriber = client
            .subscribe(subject.clone())
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        while let Some(msg) = subscriber.next().await {
            match Envelope::from_bytes(&msg.payload) {
                Ok(envelope) => {
                    BROADCAST_RECEIVE_TOTAL
                        .with_label_values(&[envelope.kind.subject_suffix(), "success"])
                        .inc();

                    if let Err(e) = handler.handle(envelope).await {
                        error!("Error handling event: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to parse envelope: {}", e);
                    BROADCAST_RECEIVE_TOTAL
                        .with_label_values(&["unknown", "parse_error"])
                        .inc();
                }
            }
        }

        Ok(())
    }
}
