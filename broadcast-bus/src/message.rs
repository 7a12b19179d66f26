//! Event envelope for the match channels

use crate::types::{ChannelKey, EventKind, PresenceUpdate, SUBJECT_ROOT};
use chrono::{DateTime, Utc};
use scoring_core::{AggregateDelta, MatchSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope around one channel event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope ID (UUIDv7 for ordering)
    pub id: Uuid,

    /// Event kind
    pub kind: EventKind,

    /// Channel the event belongs to
    pub channel: ChannelKey,

    /// Per-match mutation sequence (0 for presence events)
    pub seq: u64,

    /// Payload (JSON-serialized snapshot, delta or presence update)
    pub payload: serde_json::Value,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Headers (metadata)
    pub headers: std::collections::HashMap<String, String>,
}

impl Envelope {
    /// Create new envelope
    pub fn new(kind: EventKind, channel: ChannelKey, seq: u64, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            channel,
            seq,
            payload,
            timestamp: Utc::now(),
            headers: std::collections::HashMap::new(),
        }
    }

    /// Full-state event for a match
    pub fn full_state(match_id: Uuid, snapshot: &MatchSnapshot) -> crate::Result<Self> {
        Ok(Self::new(
            EventKind::FullState,
            ChannelKey::new(match_id),
            snapshot.seq,
            serde_json::to_value(snapshot)?,
        ))
    }

    /// Delta event for a match
    pub fn delta(match_id: Uuid, delta: &AggregateDelta) -> crate::Result<Self> {
        Ok(Self::new(
            EventKind::Delta,
            ChannelKey::new(match_id),
            delta.seq,
            serde_json::to_value(delta)?,
        ))
    }

    /// Presence event for a match
    pub fn presence(match_id: Uuid, update: &PresenceUpdate) -> crate::Result<Self> {
        Ok(Self::new(
            EventKind::Presence,
            ChannelKey::new(match_id),
            0,
            serde_json::to_value(update)?,
        ))
    }

    /// Add header
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// NATS subject for this envelope
    pub fn subject(&self) -> String {
        format!(
            "{}.{}.{}",
            SUBJECT_ROOT,
            self.channel.to_subject_segment(),
            self.kind.subject_suffix()
        )
    }
}
