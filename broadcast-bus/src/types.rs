//! Type definitions for the broadcast bus

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root token of every bus subject
pub const SUBJECT_ROOT: &str = "stumpcast";

/// Kind of event pushed on a match channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Full aggregate snapshot
    FullState,
    /// Incremental field-wise delta
    Delta,
    /// Viewer presence update
    Presence,
}

impl EventKind {
    /// Final subject token for this event kind
    pub fn subject_suffix(&self) -> &'static str {
        match self {
            EventKind::FullState => "full",
            EventKind::Delta => "delta",
            EventKind::Presence => "presence",
        }
    }
}

/// Channel key: the bus is scoped per match id.
///
/// All subjects for one match share the `stumpcast.match.{id}` prefix,
/// so one wildcard subscription covers the whole channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    /// Match the channel belongs to
    pub match_id: Uuid,
}

impl ChannelKey {
    /// Channel key for a match
    pub fn new(match_id: Uuid) -> Self {
        Self { match_id }
    }

    /// Subject segment identifying this channel
    pub fn to_subject_segment(&self) -> String {
        format!("match.{}", self.match_id)
    }

    /// Wildcard subject covering every event kind on this channel
    pub fn subscription_subject(&self) -> String {
        format!("{}.{}.>", SUBJECT_ROOT, self.to_subject_segment())
    }

    /// Compute partition number for load balancing.
    ///
    /// Per-match ordering is preserved because one match always hashes
    /// to the same partition; no cross-match ordering is promised.
    pub fn partition_number(&self, num_partitions: u32) -> u32 {
        let hash = blake3::hash(self.match_id.as_bytes());
        let hash_bytes = hash.as_bytes();
        let hash_u32 =
            u32::from_le_bytes([hash_bytes[0], hash_bytes[1], hash_bytes[2], hash_bytes[3]]);
        hash_u32 % num_partitions
    }
}

/// Viewer presence action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceAction {
    /// A viewer joined the channel
    Joined,
    /// A viewer left the channel
    Left,
}

/// Presence event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// Client identifier as known to the transport
    pub client_id: String,
    /// Join or leave
    pub action: PresenceAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_subject_segment() {
        let match_id = Uuid::nil();
        let key = ChannelKey::new(match_id);
        assert_eq!(
            key.to_subject_segment(),
            "match.00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            key.subscription_subject(),
            "stumpcast.match.00000000-0000-0000-0000-000000000000.>"
        );
    }

    #[test]
    fn test_partition_number_is_stable() {
        let key = ChannelKey::new(Uuid::now_v7());
        let partition = key.partition_number(32);
        assert!(partition < 32);

        // Same match always hashes to the same partition
        assert_eq!(partition, key.partition_number(32));

        // Different matches very likely land elsewhere
        let other = ChannelKey::new(Uuid::now_v7());
        let _ = other.partition_number(32);
    }

    #[test]
    fn test_event_kind_suffixes() {
        assert_eq!(EventKind::FullState.subject_suffix(), "full");
        assert_eq!(EventKind::Delta.subject_suffix(), "delta");
        assert_eq!(EventKind::Presence.subject_suffix(), "presence");
    }
}
