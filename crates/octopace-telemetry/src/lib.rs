//! Octopace Telemetry - Dispatch observability
//!
//! Provides:
//! - `MetricsRegistry`: Prometheus counters and histograms for throttled calls

pub mod metrics;

pub use metrics::MetricsRegistry;
