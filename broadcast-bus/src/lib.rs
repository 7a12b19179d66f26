//! StumpCast Broadcast Bus
//!
//! Real-time fan-out of match state over NATS, scoped per match id:
//! - Subjects `stumpcast.match.{id}.{full|delta|presence}`: one
//!   wildcard subscription covers a whole match channel
//! - JetStream persistence with acknowledged publishes and retry
//! - Fire-and-forget path so transport never blocks scoring
//! - Per-match ordering inherited from the single-writer actor;
//!   no cross-match ordering is promised

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod bridge;
pub mod client;
pub mod error;
pub mod message;
pub mod metrics;
pub mod publisher;
pub mod subscriber;
pub mod types;

pub use bridge::{envelope_for_event, BroadcastBridge};
pub use client::{BusClient, NatsConfig};
pub use error::{Error, Result};
pub use message::Envelope;
pub use publisher::{Publisher, PublisherConfig};
pub use subscriber::{MatchEventHandler, Subscriber, SubscriberConfig};
pub use types::{ChannelKey, EventKind, PresenceAction, PresenceUpdate, SUBJECT_ROOT};
