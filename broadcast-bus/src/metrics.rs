//! Prometheus metrics for the broadcast bus

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter_vec, CounterVec,
    HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Total events published
    pub static ref BROADCAST_PUBLISH_TOTAL: CounterVec = register_counter_vec!(
        "broadcast_publish_total",
        "Total match events published",
        &["kind", "status"]
    )
    .unwrap();

    /// Event publish duration
    pub static ref BROADCAST_PUBLISH_DURATION: HistogramVec = register_histogram_vec!(
        "broadcast_publish_duration_seconds",
        "Match event publish duration in seconds",
        &["kind"]
    )
    .unwrap();

    /// Total events received
    pub static ref BROADCAST_RECEIVE_TOTAL: CounterVec = register_counter_vec!(
        "broadcast_receive_total",
        "Total match events received",
        &["kind", "status"]
    )
    .unwrap();

    /// Events dropped by a lagging bridge
    pub static ref BROADCAST_LAG_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "broadcast_lag_dropped_total",
        "Events skipped because a bridge lagged behind its match channel",
        &["match_id"]
    )
    .unwrap();
}
