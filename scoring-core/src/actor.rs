//! Actor-based concurrency: one writer per match
//!
//! Every mutation to one match's aggregate goes through a single actor
//! task that owns the ledger and the aggregate. The mailbox serializes
//! scoring and undo, so a replay can never interleave with another
//! mutation. Reads answer from the same task, so snapshots are always
//! consistent with the ledger.
//!
//! Each successful mutation bumps the per-match sequence number and
//! emits a `MatchEvent` on a per-match broadcast channel: the
//! in-process realtime channel. Sending never blocks; a slow transport
//! lags and reconciles from a full snapshot, the scoring path does not
//! wait for it.

use crate::config::ActorConfig;
use crate::delta::AggregateDelta;
use crate::engine;
use crate::ledger::DeliveryLedger;
use crate::metrics::Metrics;
use crate::types::{
    Delivery, DeliveryInput, HistoryQuery, MatchAggregate, MatchInit, MatchSnapshot, Page,
    PlayerId,
};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

/// Event pushed to every subscriber of a match's channel after each
/// successful mutation
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchEvent {
    /// Full aggregate snapshot (undo, innings transitions, reset)
    FullState(MatchSnapshot),
    /// Incremental field-wise update (deliveries, gate resolutions)
    Delta(AggregateDelta),
}

impl MatchEvent {
    /// Mutation sequence the event was produced at
    pub fn seq(&self) -> u64 {
        match self {
            MatchEvent::FullState(snapshot) => snapshot.seq,
            MatchEvent::Delta(delta) => delta.seq,
        }
    }
}

/// Message sent to the match actor
pub enum MatchMessage {
    /// Score one delivery
    ScoreDelivery {
        /// Scorer input
        input: DeliveryInput,
        /// Updated snapshot or rejection
        response: oneshot::Sender<Result<MatchSnapshot>>,
    },

    /// Undo the most recent delivery (full-history replay)
    UndoLast {
        /// Replayed snapshot or rejection
        response: oneshot::Sender<Result<MatchSnapshot>>,
    },

    /// Read the current snapshot
    GetSnapshot {
        /// Current snapshot
        response: oneshot::Sender<MatchSnapshot>,
    },

    /// Read paginated delivery history
    GetHistory {
        /// Filter, order and pagination
        query: HistoryQuery,
        /// Matching page
        response: oneshot::Sender<Page<Delivery>>,
    },

    /// Name the replacement for a dismissed batter
    ReplaceBatter {
        /// Incoming batter
        batter: PlayerId,
        /// Updated snapshot or rejection
        response: oneshot::Sender<Result<MatchSnapshot>>,
    },

    /// Name the bowler for a new over
    StartOver {
        /// Bowler of the next over
        bowler: PlayerId,
        /// Updated snapshot or rejection
        response: oneshot::Sender<Result<MatchSnapshot>>,
    },

    /// Authorized mid-over bowler substitution
    SubstituteBowler {
        /// Replacement bowler
        bowler: PlayerId,
        /// Updated snapshot or rejection
        response: oneshot::Sender<Result<MatchSnapshot>>,
    },

    /// Start the second innings
    StartInnings {
        /// Opening striker of the chase
        striker: PlayerId,
        /// Opening non-striker
        non_striker: PlayerId,
        /// Opening bowler
        bowler: PlayerId,
        /// Updated snapshot or rejection
        response: oneshot::Sender<Result<MatchSnapshot>>,
    },

    /// Administrative reset to the match's initial state
    Reset {
        /// Fresh snapshot
        response: oneshot::Sender<Result<MatchSnapshot>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor owning one match's ledger and aggregate
pub struct MatchActor {
    /// Source of truth
    ledger: DeliveryLedger,

    /// Derived state, always the fold of the ledger
    aggregate: MatchAggregate,

    /// Per-match mutation sequence
    seq: u64,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<MatchMessage>,

    /// Per-match realtime channel
    events: broadcast::Sender<MatchEvent>,

    /// Metrics collector
    metrics: Arc<Metrics>,

    /// Default history page size when the query leaves it at 0
    history_page_size: usize,
}

impl MatchActor {
    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                MatchMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }
        tracing::debug!(match_id = %self.ledger.init().match_id, "match actor stopped");
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: MatchMessage) {
        match msg {
            MatchMessage::ScoreDelivery { input, response } => {
                let result = self.score_delivery(input);
                let _ = response.send(result);
            }

            MatchMessage::UndoLast { response } => {
                let result = self.undo_last();
                let _ = response.send(result);
            }

            MatchMessage::GetSnapshot { response } => {
                let _ = response.send(self.snapshot());
            }

            MatchMessage::GetHistory { mut query, response } => {
                if query.per_page == 0 {
                    query.per_page = self.history_page_size;
                }
                let _ = response.send(self.ledger.history(&query));
            }

            MatchMessage::ReplaceBatter { batter, response } => {
                let result = self.apply_gate_action(|agg| engine::replace_batter(agg, &batter));
                let _ = response.send(result);
            }

            MatchMessage::StartOver { bowler, response } => {
                let result = self.apply_gate_action(|agg| engine::start_over(agg, &bowler));
                let _ = response.send(result);
            }

            MatchMessage::SubstituteBowler { bowler, response } => {
                let result = self.apply_gate_action(|agg| engine::substitute_bowler(agg, &bowler));
                let _ = response.send(result);
            }

            MatchMessage::StartInnings {
                striker,
                non_striker,
                bowler,
                response,
            } => {
                let result = self.start_innings(&striker, &non_striker, &bowler);
                let _ = response.send(result);
            }

            MatchMessage::Reset { response } => {
                let _ = response.send(Ok(self.reset()));
            }

            MatchMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Current snapshot
    fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            seq: self.seq,
            aggregate: self.aggregate.clone(),
        }
    }

    /// Score one delivery: engine apply, ledger append, install, emit
    fn score_delivery(&mut self, input: DeliveryInput) -> Result<MatchSnapshot> {
        match engine::apply(&self.aggregate, &input) {
            Ok((next, delivery)) => {
                self.ledger.append(delivery);
                self.metrics.record_delivery();
                Ok(self.install_delta(next))
            }
            Err(e) => {
                self.metrics.record_rejected();
                Err(e)
            }
        }
    }

    /// Undo the most recent delivery by full-history replay
    fn undo_last(&mut self) -> Result<MatchSnapshot> {
        let start = Instant::now();
        match self.ledger.undo_last() {
            Ok((removed, aggregate)) => {
                tracing::info!(
                    match_id = %self.aggregate.match_id,
                    delivery_id = %removed.delivery_id,
                    "delivery undone"
                );
                self.metrics.record_undo(start.elapsed().as_secs_f64());
                Ok(self.install_full(aggregate))
            }
            Err(e) => {
                self.metrics.record_rejected();
                Err(e)
            }
        }
    }

    /// Apply a gate-resolving action and emit the resulting delta
    fn apply_gate_action<F>(&mut self, action: F) -> Result<MatchSnapshot>
    where
        F: FnOnce(&MatchAggregate) -> Result<MatchAggregate>,
    {
        match action(&self.aggregate) {
            Ok(next) => Ok(self.install_delta(next)),
            Err(e) => {
                self.metrics.record_rejected();
                Err(e)
            }
        }
    }

    /// Transition to the second innings and emit a full snapshot
    fn start_innings(
        &mut self,
        striker: &PlayerId,
        non_striker: &PlayerId,
        bowler: &PlayerId,
    ) -> Result<MatchSnapshot> {
        match engine::begin_second_innings(&self.aggregate, striker, non_striker, bowler) {
            Ok(next) => {
                self.aggregate = next;
                self.seq += 1;
                let snapshot = self.snapshot();
                let _ = self.events.send(MatchEvent::FullState(snapshot.clone()));
                Ok(snapshot)
            }
            Err(e) => {
                self.metrics.record_rejected();
                Err(e)
            }
        }
    }

    /// Administrative reset to the initial state
    fn reset(&mut self) -> MatchSnapshot {
        tracing::warn!(match_id = %self.aggregate.match_id, "administrative match reset");
        self.ledger.reset();
        self.aggregate = MatchAggregate::new(self.ledger.init());
        self.seq += 1;
        let snapshot = self.snapshot();
        let _ = self.events.send(MatchEvent::FullState(snapshot.clone()));
        snapshot
    }

    /// Install a new aggregate and emit an incremental delta
    fn install_delta(&mut self, next: MatchAggregate) -> MatchSnapshot {
        self.seq += 1;
        let delta = AggregateDelta::diff(&self.aggregate, &next, self.seq);
        self.aggregate = next;
        let _ = self.events.send(MatchEvent::Delta(delta));
        self.snapshot()
    }

    /// Install a new aggregate and emit a full snapshot
    fn install_full(&mut self, next: MatchAggregate) -> MatchSnapshot {
        self.seq += 1;
        self.aggregate = next;
        let snapshot = self.snapshot();
        let _ = self.events.send(MatchEvent::FullState(snapshot.clone()));
        snapshot
    }
}

/// Handle for sending messages to a match actor
#[derive(Clone, Debug)]
pub struct MatchHandle {
    match_id: Uuid,
    sender: mpsc::Sender<MatchMessage>,
    events: broadcast::Sender<MatchEvent>,
}

impl MatchHandle {
    /// The match this handle drives
    pub fn match_id(&self) -> Uuid {
        self.match_id
    }

    /// Subscribe to the match's realtime channel
    pub fn subscribe_events(&self) -> broadcast::Receiver<MatchEvent> {
        self.events.subscribe()
    }

    /// Score one delivery
    pub async fn score_delivery(&self, input: DeliveryInput) -> Result<MatchSnapshot> {
        self.request(|response| MatchMessage::ScoreDelivery { input, response })
            .await?
    }

    /// Undo the most recent delivery
    pub async fn undo_last(&self) -> Result<MatchSnapshot> {
        self.request(|response| MatchMessage::UndoLast { response })
            .await?
    }

    /// Read the current snapshot
    pub async fn snapshot(&self) -> Result<MatchSnapshot> {
        self.request(|response| MatchMessage::GetSnapshot { response })
            .await
    }

    /// Read paginated delivery history
    pub async fn history(&self, query: HistoryQuery) -> Result<Page<Delivery>> {
        self.request(|response| MatchMessage::GetHistory { query, response })
            .await
    }

    /// Name the replacement for a dismissed batter
    pub async fn replace_batter(&self, batter: PlayerId) -> Result<MatchSnapshot> {
        self.request(|response| MatchMessage::ReplaceBatter { batter, response })
            .await?
    }

    /// Name the bowler for a new over
    pub async fn start_over(&self, bowler: PlayerId) -> Result<MatchSnapshot> {
        self.request(|response| MatchMessage::StartOver { bowler, response })
            .await?
    }

    /// Authorized mid-over bowler substitution
    pub async fn substitute_bowler(&self, bowler: PlayerId) -> Result<MatchSnapshot> {
        self.request(|response| MatchMessage::SubstituteBowler { bowler, response })
            .await?
    }

    /// Start the second innings
    pub async fn start_innings(
        &self,
        striker: PlayerId,
        non_striker: PlayerId,
        bowler: PlayerId,
    ) -> Result<MatchSnapshot> {
        self.request(|response| MatchMessage::StartInnings {
            striker,
            non_striker,
            bowler,
            response,
        })
        .await?
    }

    /// Administrative reset to the match's initial state
    pub async fn reset(&self) -> Result<MatchSnapshot> {
        self.request(|response| MatchMessage::Reset { response })
            .await?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MatchMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }

    /// Send a message and await its oneshot response
    async fn request<T, F>(&self, make: F) -> Result<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> MatchMessage,
    {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }
}

/// Spawn the actor for one match
pub fn spawn_match_actor(
    init: MatchInit,
    config: &ActorConfig,
    metrics: Arc<Metrics>,
) -> Result<MatchHandle> {
    let ledger = DeliveryLedger::new(init)?;
    let aggregate = MatchAggregate::new(ledger.init());
    let match_id = aggregate.match_id;

    let (tx, rx) = mpsc::channel(config.mailbox_capacity);
    let (events, _) = broadcast::channel(config.event_channel_capacity);

    let actor = MatchActor {
        ledger,
        aggregate,
        seq: 0,
        mailbox: rx,
        events: events.clone(),
        metrics,
        history_page_size: config.history_page_size,
    };

    tokio::spawn(async move {
        actor.run().await;
    });

    tracing::info!(match_id = %match_id, "match actor spawned");

    Ok(MatchHandle {
        match_id,
        sender: tx,
        events,
    })
}
