/// Metric provider for system resource sampling
pub mod metrics_collector;

pub use metrics_collector::{MetricProvider, SystemMetricsProvider};

#[cfg(test)]
pub use metrics_collector::MockMetricProvider;
