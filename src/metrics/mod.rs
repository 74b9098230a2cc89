// Module declarations
pub(crate) mod metrics_errors;
pub(crate) mod metrics_model;
pub(crate) mod metrics_repository;
pub(crate) mod metrics_service;

#[cfg(test)]
mod metrics_service_tests;

// Re-export the public interface
pub use metrics_model::{
    AlignedPricePoint, AlignedSeries, DerivedMetric, DerivedMetricDB, MetricKind, MetricsConfig,
    NewDerivedMetric, RecomputeSummary,
};
pub use metrics_repository::MetricsRepository;
pub use metrics_service::{
    align_on_union_calendar, allocation_weights, annualized_return, cumulative_return,
    log_return_volatility, max_drawdown, AllocationDimension, MetricsService, MetricsServiceTrait,
};

// Re-export error types for convenience
pub use metrics_errors::{MetricError, Result};
