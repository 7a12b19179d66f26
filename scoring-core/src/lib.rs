//! StumpCast Scoring Core
//!
//! The delivery-scoring state machine for live cricket matches, with an
//! event-sourced undo mechanism and a per-match realtime channel.
//!
//! # Architecture
//!
//! - **Event Sourcing**: the append-only delivery ledger is the sole
//!   source of truth; the aggregate is a pure fold of it
//! - **Pure Engine**: `(aggregate, input) → (new aggregate, record)`,
//!   no I/O and no clocks, so replay-based undo is provably correct
//! - **Single Writer**: one actor per match serializes every mutation
//! - **Gates**: server-authoritative preconditions (new batter, new
//!   over) block scoring until explicitly resolved
//!
//! # Invariants
//!
//! - The innings total always equals the sum of runs contributed by the
//!   current innings' ledger entries
//! - Replaying the full ledger from the initial state reproduces the
//!   live aggregate
//! - Undo after N deliveries reproduces the aggregate after N−1

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod registry;
pub mod types;

// Re-exports
pub use actor::{spawn_match_actor, MatchEvent, MatchHandle};
pub use config::Config;
pub use delta::AggregateDelta;
pub use error::{Error, Result};
pub use ledger::DeliveryLedger;
pub use registry::MatchRegistry;
pub use types::{
    BattingLine, BowlingLine, Delivery, DeliveryInput, Dismissal, DismissalKind, ExtraType,
    Extras, Gates, HistoryOrder, HistoryQuery, MatchAggregate, MatchInit, MatchResult,
    MatchSnapshot, MatchStatus, Page, PlayerId, ScoringPhase,
};
