//! Delivery ledger and undo controller
//!
//! The append-only, ordered log of canonical delivery records for one
//! match, the sole source of truth. The aggregate is always a fold of
//! this log from the match's initial state. Undo removes exactly the
//! most recent entry and replays the rest; inverse operations are never
//! hand-written.

use crate::engine;
use crate::types::{Delivery, HistoryOrder, HistoryQuery, MatchAggregate, MatchInit, Page};
use crate::{Error, Result};

/// Append-only delivery log for one match
#[derive(Debug, Clone)]
pub struct DeliveryLedger {
    /// Initial state the replay starts from (openers + toss decision)
    init: MatchInit,

    /// Canonical records in application order
    entries: Vec<Delivery>,
}

impl DeliveryLedger {
    /// Create an empty ledger for a match
    pub fn new(init: MatchInit) -> Result<Self> {
        init.validate()?;
        Ok(Self {
            init,
            entries: Vec::new(),
        })
    }

    /// The match's initial state
    pub fn init(&self) -> &MatchInit {
        &self.init
    }

    /// Number of recorded deliveries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All records in application order
    pub fn entries(&self) -> &[Delivery] {
        &self.entries
    }

    /// Append a canonical record produced by the engine
    pub fn append(&mut self, delivery: Delivery) {
        self.entries.push(delivery);
    }

    /// Administrative reset: discard every entry
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Drop the most recent entry and rebuild the aggregate by replaying
    /// every remaining entry from the initial state.
    ///
    /// Fails with Conflict when the ledger is empty. A replay failure
    /// restores the entry and reports ledger corruption: the operation
    /// is all-or-nothing.
    pub fn undo_last(&mut self) -> Result<(Delivery, MatchAggregate)> {
        let removed = self.entries.pop().ok_or_else(|| {
            Error::Conflict("ledger is empty; nothing to undo".to_string())
        })?;

        match self.replay() {
            Ok(aggregate) => {
                tracing::debug!(
                    match_id = %self.init.match_id,
                    remaining = self.entries.len(),
                    "undo replay complete"
                );
                Ok((removed, aggregate))
            }
            Err(e) => {
                self.entries.push(removed);
                Err(e)
            }
        }
    }

    /// Fold the full ledger through the engine from the initial state.
    ///
    /// Gate resolutions (over starts, batter replacements, innings
    /// transitions) are re-derived from the records themselves. Also the
    /// internal-consistency check: the result must always equal the
    /// live aggregate.
    pub fn replay(&self) -> Result<MatchAggregate> {
        let mut aggregate = MatchAggregate::new(&self.init);
        for record in &self.entries {
            if aggregate.is_terminal() {
                return Err(Error::LedgerCorruption(format!(
                    "delivery {} recorded after match completion",
                    record.delivery_id
                )));
            }
            aggregate = engine::resolve_for_replay(aggregate, record)?;
            aggregate = engine::fold_delivery(&aggregate, record);
        }
        Ok(aggregate)
    }

    /// Paginated, filterable delivery history
    pub fn history(&self, query: &HistoryQuery) -> Page<Delivery> {
        let per_page = query.per_page.max(1);

        let mut items: Vec<Delivery> = self
            .entries
            .iter()
            .filter(|d| query.inning.map_or(true, |inning| d.inning == inning))
            .cloned()
            .collect();
        if query.order == HistoryOrder::NewestFirst {
            items.reverse();
        }

        let total = items.len();
        let items = items
            .into_iter()
            .skip(query.page * per_page)
            .take(per_page)
            .collect();

        Page {
            items,
            page: query.page,
            per_page,
            total,
        }
    }
}
