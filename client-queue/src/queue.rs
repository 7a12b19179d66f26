//! Offline submission queue
//!
//! Buffers outgoing deliveries while disconnected instead of dropping
//! them. On reconnect the queue flushes strictly in original order and
//! halts on the first failure: silent reordering would corrupt the
//! ledger. An item is removed only after the server confirms
//! acceptance, never assumed successful. The last server snapshot is
//! retained because server-provided gate state always overrides any
//! client-side guess about whose turn it is to bat or bowl.

use crate::error::SubmitError;
use crate::transport::SubmissionTransport;
use chrono::{DateTime, Utc};
use scoring_core::{DeliveryInput, MatchSnapshot, ScoringPhase};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// One buffered submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedSubmission {
    /// Queue-local id
    pub queued_id: Uuid,

    /// Match the delivery belongs to
    pub match_id: Uuid,

    /// The delivery input, stamped when the scorer entered it
    pub input: DeliveryInput,

    /// When the item entered the queue
    pub queued_at: DateTime<Utc>,
}

/// Outcome of one flush cycle
#[derive(Debug, Clone)]
pub struct FlushReport {
    /// Submissions the server confirmed this cycle
    pub accepted: usize,

    /// Items still queued (the failed item and everything behind it)
    pub remaining: usize,

    /// The failure that halted the flush, if any
    pub halted_on: Option<SubmitError>,
}

impl FlushReport {
    /// Whether the queue fully drained
    pub fn drained(&self) -> bool {
        self.halted_on.is_none() && self.remaining == 0
    }
}

/// Client-side buffer of outgoing delivery submissions
#[derive(Debug, Default)]
pub struct OfflineQueue {
    pending: VecDeque<QueuedSubmission>,
    last_snapshot: Option<MatchSnapshot>,
}

impl OfflineQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer one submission, preserving arrival order
    pub fn enqueue(&mut self, match_id: Uuid, input: DeliveryInput) -> Uuid {
        let queued_id = Uuid::now_v7();
        self.pending.push_back(QueuedSubmission {
            queued_id,
            match_id,
            input,
            queued_at: Utc::now(),
        });
        tracing::debug!(%queued_id, pending = self.pending.len(), "delivery queued");
        queued_id
    }

    /// Items waiting to be flushed, in order
    pub fn pending(&self) -> impl Iterator<Item = &QueuedSubmission> {
        self.pending.iter()
    }

    /// Number of buffered items
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The last snapshot the server returned, if any
    pub fn last_snapshot(&self) -> Option<&MatchSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// The server-authoritative scoring phase. Always trust this over
    /// any locally inferred turn order.
    pub fn server_phase(&self) -> Option<ScoringPhase> {
        self.last_snapshot
            .as_ref()
            .map(|snapshot| snapshot.aggregate.phase)
    }

    /// Record a snapshot received from the server (flush responses or
    /// the realtime channel). Stale sequences are ignored.
    pub fn observe_snapshot(&mut self, snapshot: MatchSnapshot) {
        let stale = self
            .last_snapshot
            .as_ref()
            .map(|held| snapshot.seq < held.seq)
            .unwrap_or(false);
        if !stale {
            self.last_snapshot = Some(snapshot);
        }
    }

    /// Drop the front item. For a scorer explicitly resolving an entry
    /// the server keeps rejecting; the queue never drops items itself.
    pub fn discard_front(&mut self) -> Option<QueuedSubmission> {
        let discarded = self.pending.pop_front();
        if let Some(item) = &discarded {
            tracing::warn!(queued_id = %item.queued_id, "queued delivery discarded");
        }
        discarded
    }

    /// Flush buffered submissions strictly in order.
    ///
    /// Halts on the first failure, leaving the failed item at the front
    /// for the next reconnect cycle. Items are removed only after the
    /// server confirms acceptance.
    pub async fn flush<T: SubmissionTransport>(&mut self, transport: &T) -> FlushReport {
        let mut accepted = 0;

        while let Some(front) = self.pending.front() {
            match transport
                .submit_delivery(front.match_id, &front.input)
                .await
            {
                Ok(snapshot) => {
                    self.observe_snapshot(snapshot);
                    self.pending.pop_front();
                    accepted += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        queued_id = %front.queued_id,
                        remaining = self.pending.len(),
                        "flush halted: {}",
                        e
                    );
                    return FlushReport {
                        accepted,
                        remaining: self.pending.len(),
                        halted_on: Some(e),
                    };
                }
            }
        }

        tracing::debug!(accepted, "offline queue drained");
        FlushReport {
            accepted,
            remaining: 0,
            halted_on: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use scoring_core::{ExtraType, MatchAggregate, MatchInit, PlayerId};

    fn input(runs: u32) -> DeliveryInput {
        DeliveryInput {
            bowler: PlayerId::new("b"),
            runs_off_bat: runs,
            extra_type: ExtraType::None,
            extra_runs_run: 0,
            is_boundary: false,
            dismissal: None,
            timestamp: Utc::now(),
        }
    }

    fn snapshot(seq: u64) -> MatchSnapshot {
        let init = MatchInit {
            match_id: Uuid::now_v7(),
            overs_limit: 20,
            squad: vec![PlayerId::new("s"), PlayerId::new("n"), PlayerId::new("b")],
            opening_striker: PlayerId::new("s"),
            opening_non_striker: PlayerId::new("n"),
            opening_bowler: PlayerId::new("b"),
            started_at: Utc::now(),
        };
        MatchSnapshot {
            seq,
            aggregate: MatchAggregate::new(&init),
        }
    }

    /// Transport that accepts submissions until a scripted failure
    struct MockTransport {
        submitted: Mutex<Vec<u32>>,
        fail_at: Mutex<Option<usize>>,
        next_seq: Mutex<u64>,
    }

    impl MockTransport {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
                fail_at: Mutex::new(fail_at),
                next_seq: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl SubmissionTransport for MockTransport {
        async fn submit_delivery(
            &self,
            _match_id: Uuid,
            input: &DeliveryInput,
        ) -> Result<MatchSnapshot> {
            let count = self.submitted.lock().len();
            if Some(count) == *self.fail_at.lock() {
                return Err(SubmitError::Transport("connection dropped".to_string()));
            }
            self.submitted.lock().push(input.runs_off_bat);
            let mut seq = self.next_seq.lock();
            *seq += 1;
            Ok(snapshot(*seq))
        }
    }

    #[tokio::test]
    async fn test_flush_preserves_order_and_drains() {
        let mut queue = OfflineQueue::new();
        let match_id = Uuid::now_v7();
        for runs in [1, 2, 3] {
            queue.enqueue(match_id, input(runs));
        }

        let transport = MockTransport::new(None);
        let report = queue.flush(&transport).await;

        assert!(report.drained());
        assert_eq!(report.accepted, 3);
        assert!(queue.is_empty());
        assert_eq!(*transport.submitted.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_flush_halts_on_first_failure() {
        let mut queue = OfflineQueue::new();
        let match_id = Uuid::now_v7();
        for runs in [1, 2, 3, 4] {
            queue.enqueue(match_id, input(runs));
        }

        // Second submission fails in transit
        let transport = MockTransport::new(Some(1));
        let report = queue.flush(&transport).await;

        assert_eq!(report.accepted, 1);
        assert_eq!(report.remaining, 3);
        assert!(matches!(report.halted_on, Some(SubmitError::Transport(_))));
        // The failed item is still at the front; nothing was reordered
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pending().next().unwrap().input.runs_off_bat, 2);

        // Next reconnect cycle picks up where it halted
        let transport = MockTransport::new(None);
        let report = queue.flush(&transport).await;
        assert!(report.drained());
        assert_eq!(*transport.submitted.lock(), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_item_removed_only_after_confirmation() {
        let mut queue = OfflineQueue::new();
        queue.enqueue(Uuid::now_v7(), input(1));

        // Server rejects: the item must stay queued
        let transport = MockTransport::new(Some(0));
        let report = queue.flush(&transport).await;
        assert_eq!(report.accepted, 0);
        assert_eq!(queue.len(), 1);

        // The scorer resolves it explicitly
        let discarded = queue.discard_front().unwrap();
        assert_eq!(discarded.input.runs_off_bat, 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_server_snapshot_overrides_client_guess() {
        let mut queue = OfflineQueue::new();
        assert_eq!(queue.server_phase(), None);

        queue.enqueue(Uuid::now_v7(), input(0));
        let transport = MockTransport::new(None);
        queue.flush(&transport).await;

        // Whatever the client assumed, the server's phase is the truth
        assert_eq!(queue.server_phase(), Some(ScoringPhase::ReadyToScore));

        // Stale snapshots never overwrite a newer one
        let newer = queue.last_snapshot().unwrap().seq;
        queue.observe_snapshot(snapshot(0));
        assert_eq!(queue.last_snapshot().unwrap().seq, newer);
    }
}
