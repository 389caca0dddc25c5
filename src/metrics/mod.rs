mod collector;
mod sampler;
mod system_probe;

pub use collector::{
    MetricsCollector, MetricsSummary, OperationMetrics, SystemResourceMetrics, Timing,
};
