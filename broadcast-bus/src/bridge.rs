//! Bridge from a match actor's event channel onto the bus
//!
//! The actor emits on an in-process broadcast channel and never waits
//! for anyone. The bridge drains that channel and publishes each event
//! to the match's NATS subjects; if the bridge lags behind a fast
//! scorer, skipped events are counted and viewers reconcile from the
//! next full snapshot. Scoring is never back-pressured by a slow
//! transport.

use crate::message::Envelope;
use crate::metrics::BROADCAST_LAG_DROPPED_TOTAL;
use crate::publisher::Publisher;
use crate::Result;
use scoring_core::{MatchEvent, MatchHandle};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Convert one in-process match event into its bus envelope
pub fn envelope_for_event(match_id: Uuid, event: &MatchEvent) -> Result<Envelope> {
    match event {
        MatchEvent::FullState(snapshot) => Envelope::full_state(match_id, snapshot),
        MatchEvent::Delta(delta) => Envelope::delta(match_id, delta),
    }
}

/// Forwards match events from actors to the bus
pub struct BroadcastBridge {
    publisher: Arc<Publisher>,
}

impl BroadcastBridge {
    /// Create a bridge over a publisher
    pub fn new(publisher: Arc<Publisher>) -> Self {
        Self { publisher }
    }

    /// Attach to a match: spawn a task that forwards every event the
    /// match emits until its actor shuts down
    pub fn attach(&self, handle: &MatchHandle) -> JoinHandle<()> {
        let match_id = handle.match_id();
        let mut events = handle.subscribe_events();
        let publisher = Arc::clone(&self.publisher);

        info!(match_id = %match_id, "broadcast bridge attached");

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match envelope_for_event(match_id, &event) {
                        Ok(envelope) => {
                            if let Err(e) = publisher.publish(&envelope).await {
                                warn!(
                                    match_id = %match_id,
                                    seq = event.seq(),
                                    "event publish failed, viewers reconcile from snapshot: {}",
                                    e
                                );
                            }
                        }
                        Err(e) => {
                            warn!(match_id = %match_id, "event serialization failed: {}", e);
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        BROADCAST_LAG_DROPPED_TOTAL
                            .with_label_values(&[match_id.to_string().as_str()])
                            .inc_by(skipped);
                        warn!(
                            match_id = %match_id,
                            skipped,
                            "bridge lagged behind the match channel"
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            info!(match_id = %match_id, "broadcast bridge detached");
        })
    }
}
