//! Submission transport trait
//!
//! The queue is transport-agnostic: anything that can deliver one
//! submission to the scoring core and relay its verdict works -
//! HTTP, the realtime channel's request path, or an in-process handle
//! in tests.

use crate::error::Result;
use async_trait::async_trait;
use scoring_core::{DeliveryInput, MatchSnapshot};
use uuid::Uuid;

/// Delivers queued submissions to the scoring core
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Submit one delivery; on acceptance the server returns the
    /// updated snapshot, which carries the authoritative gate state
    async fn submit_delivery(
        &self,
        match_id: Uuid,
        input: &DeliveryInput,
    ) -> Result<MatchSnapshot>;
}
