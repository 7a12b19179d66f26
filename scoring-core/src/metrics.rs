//! Metrics collection for observability
//!
//! Prometheus metrics for the scoring core, registered against an owned
//! registry so independent instances never collide.
//!
//! # Metrics
//!
//! - `scoring_deliveries_total` - Deliveries scored
//! - `scoring_undos_total` - Undo operations completed
//! - `scoring_rejected_total` - Mutations rejected (validation/conflict)
//! - `scoring_replay_duration_seconds` - Undo replay latency
//! - `scoring_active_matches` - Live match actors

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Deliveries scored
    pub deliveries_total: IntCounter,

    /// Undo operations completed
    pub undos_total: IntCounter,

    /// Mutations rejected before any state change
    pub rejected_total: IntCounter,

    /// Undo replay latency histogram
    pub replay_duration: Histogram,

    /// Live match actors
    pub active_matches: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deliveries_total =
            IntCounter::new("scoring_deliveries_total", "Deliveries scored")?;
        registry.register(Box::new(deliveries_total.clone()))?;

        let undos_total = IntCounter::new("scoring_undos_total", "Undo operations completed")?;
        registry.register(Box::new(undos_total.clone()))?;

        let rejected_total = IntCounter::new(
            "scoring_rejected_total",
            "Mutations rejected before any state change",
        )?;
        registry.register(Box::new(rejected_total.clone()))?;

        let replay_duration = Histogram::with_opts(
            HistogramOpts::new(
                "scoring_replay_duration_seconds",
                "Undo replay latency",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(replay_duration.clone()))?;

        let active_matches = IntGauge::new("scoring_active_matches", "Live match actors")?;
        registry.register(Box::new(active_matches.clone()))?;

        Ok(Self {
            deliveries_total,
            undos_total,
            rejected_total,
            replay_duration,
            active_matches,
            registry,
        })
    }

    /// Record a scored delivery
    pub fn record_delivery(&self) {
        self.deliveries_total.inc();
    }

    /// Record an undo and its replay latency
    pub fn record_undo(&self, duration_seconds: f64) {
        self.undos_total.inc();
        self.replay_duration.observe(duration_seconds);
    }

    /// Record a rejected mutation
    pub fn record_rejected(&self) {
        self.rejected_total.inc();
    }

    /// Record a match actor starting
    pub fn record_match_started(&self) {
        self.active_matches.inc();
    }

    /// Record a match actor stopping
    pub fn record_match_stopped(&self) {
        self.active_matches.dec();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.deliveries_total.get(), 0);
        assert_eq!(metrics.undos_total.get(), 0);
    }

    #[test]
    fn test_record_delivery() {
        let metrics = Metrics::new().unwrap();
        metrics.record_delivery();
        metrics.record_delivery();
        assert_eq!(metrics.deliveries_total.get(), 2);
    }

    #[test]
    fn test_record_undo() {
        let metrics = Metrics::new().unwrap();
        metrics.record_undo(0.002);
        assert_eq!(metrics.undos_total.get(), 1);
    }

    #[test]
    fn test_active_matches_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.record_match_started();
        metrics.record_match_started();
        metrics.record_match_stopped();
        assert_eq!(metrics.active_matches.get(), 1);
    }
}
