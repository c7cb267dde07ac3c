//! Prometheus metrics registry for Octopace
//!
//! Provides labeled counters and histograms for throttled operation calls:
//! final outcomes, individual attempts, retries and time spent waiting on
//! pacing gates.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Central metrics registry holding all Prometheus metrics.
pub struct MetricsRegistry {
    registry: Registry,
    /// Counter: completed calls by (group, operation, outcome)
    pub calls_total: IntCounterVec,
    /// Counter: invocations of the underlying operation by group
    pub attempts_total: IntCounterVec,
    /// Counter: retries scheduled by group
    pub retries_total: IntCounterVec,
    /// Histogram: time spent waiting for a pacing slot, by group
    pub throttle_wait_seconds: HistogramVec,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("octopace".to_string()), None)?;

        let calls_total = IntCounterVec::new(
            Opts::new("calls_total", "Completed throttled calls"),
            &["group", "operation", "outcome"],
        )?;
        registry.register(Box::new(calls_total.clone()))?;

        let attempts_total = IntCounterVec::new(
            Opts::new("attempts_total", "Invocations of the underlying operation"),
            &["group"],
        )?;
        registry.register(Box::new(attempts_total.clone()))?;

        let retries_total = IntCounterVec::new(
            Opts::new("retries_total", "Retries scheduled after a failed attempt"),
            &["group"],
        )?;
        registry.register(Box::new(retries_total.clone()))?;

        let throttle_wait_seconds = HistogramVec::new(
            HistogramOpts::new(
                "throttle_wait_seconds",
                "Time spent waiting for a pacing slot in seconds",
            )
            .buckets(vec![0.0, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0, f64::INFINITY]),
            &["group"],
        )?;
        registry.register(Box::new(throttle_wait_seconds.clone()))?;

        Ok(Self {
            registry,
            calls_total,
            attempts_total,
            retries_total,
            throttle_wait_seconds,
        })
    }

    // ========================================================================
    // Recording helpers
    // ========================================================================

    /// Record the final outcome of a call (`success` or `failure`).
    pub fn record_call(&self, group: &str, operation: &str, outcome: &str) {
        self.calls_total
            .with_label_values(&[group, operation, outcome])
            .inc();
    }

    /// Record one invocation of the underlying operation.
    pub fn record_attempt(&self, group: &str) {
        self.attempts_total.with_label_values(&[group]).inc();
    }

    /// Record that a failed attempt will be retried.
    pub fn record_retry(&self, group: &str) {
        self.retries_total.with_label_values(&[group]).inc();
    }

    /// Observe the time a call spent waiting on its pacing gates.
    pub fn observe_throttle_wait(&self, group: &str, wait_secs: f64) {
        self.throttle_wait_seconds
            .with_label_values(&[group])
            .observe(wait_secs);
    }

    /// Current value of `attempts_total` for a group.
    pub fn attempts(&self, group: &str) -> u64 {
        self.attempts_total.with_label_values(&[group]).get()
    }

    /// Current value of `retries_total` for a group.
    pub fn retries(&self, group: &str) -> u64 {
        self.retries_total.with_label_values(&[group]).get()
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
