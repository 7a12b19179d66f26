//! Match registry: one actor handle per live match
//!
//! Different matches share no mutable state and need no cross-match
//! coordination: the registry is a concurrent map from match id to the
//! match's single-writer handle.

use crate::actor::{spawn_match_actor, MatchHandle};
use crate::config::Config;
use crate::metrics::Metrics;
use crate::types::MatchInit;
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Registry of live match actors
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
    config: Config,
    metrics: Arc<Metrics>,
}

impl MatchRegistry {
    /// Create a new registry
    pub fn new(config: Config) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("failed to create metrics: {}", e)))?;
        Ok(Self {
            matches: DashMap::new(),
            config,
            metrics: Arc::new(metrics),
        })
    }

    /// Create a match and spawn its actor
    pub fn create_match(&self, init: MatchInit) -> Result<MatchHandle> {
        if self.matches.contains_key(&init.match_id) {
            return Err(Error::Conflict(format!(
                "match {} already exists",
                init.match_id
            )));
        }

        let match_id = init.match_id;
        let handle = spawn_match_actor(init, &self.config.actor, self.metrics.clone())?;
        self.matches.insert(match_id, handle.clone());
        self.metrics.record_match_started();

        tracing::info!(match_id = %match_id, "match created");
        Ok(handle)
    }

    /// Look up the handle for a match
    pub fn get(&self, match_id: &Uuid) -> Result<MatchHandle> {
        self.matches
            .get(match_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::MatchNotFound(match_id.to_string()))
    }

    /// Remove a match and shut its actor down
    pub async fn remove(&self, match_id: &Uuid) -> Result<()> {
        let (_, handle) = self
            .matches
            .remove(match_id)
            .ok_or_else(|| Error::MatchNotFound(match_id.to_string()))?;

        handle.shutdown().await?;
        self.metrics.record_match_stopped();
        tracing::info!(match_id = %match_id, "match removed");
        Ok(())
    }

    /// Number of live matches
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether no matches are live
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Metrics collector shared by all match actors
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
