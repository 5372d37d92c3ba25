//! Metric name constants for the DA-sequencer driven block production pipeline.
//!
//! Mirrors the gauge/counter constant pattern used by the rest of the node service; recording
//! sites are gated behind the `metrics` feature.

/// Metric names emitted by [`crate::driver`] and [`crate::client`].
#[derive(Debug)]
pub struct Metrics;

impl Metrics {
    /// Gauge: wall-clock duration of the most recently completed batch-seal cycle.
    pub const NODEKIT_BATCH_SEAL_DURATION: &'static str = "kona_nodekit_batch_seal_duration_seconds";
    /// Counter: number of times a DA batch was discarded due to a detected reorg.
    pub const NODEKIT_REORG_COUNT: &'static str = "kona_nodekit_reorg_count";
    /// Counter: number of header-window anomalies accepted under the lenient policy.
    pub const NODEKIT_WINDOW_ANOMALY_COUNT: &'static str = "kona_nodekit_window_anomaly_count";

    /// Registers the above metrics with descriptions, following the workspace's metrics
    /// registration convention.
    #[cfg(feature = "metrics")]
    pub fn describe() {
        metrics::describe_gauge!(
            Self::NODEKIT_BATCH_SEAL_DURATION,
            metrics::Unit::Seconds,
            "Duration from opening a DA batch to sealing it"
        );
        metrics::describe_counter!(
            Self::NODEKIT_REORG_COUNT,
            "Number of DA batches discarded due to a detected reorg"
        );
        metrics::describe_counter!(
            Self::NODEKIT_WINDOW_ANOMALY_COUNT,
            "Number of header-window anomalies accepted under the lenient policy"
        );
    }
}
