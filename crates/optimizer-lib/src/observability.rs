//! Observability infrastructure for the optimizer
//!
//! Provides:
//! - Prometheus metrics (optimization latency, candidate counts, errors, model version)
//! - Structured JSON logging with tracing

use crate::models::OptimizationResult;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for optimization latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OptimizerMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct OptimizerMetricsInner {
    optimization_latency_seconds: Histogram,
    candidates_evaluated: IntCounter,
    candidates_rejected: IntCounter,
    optimizations: IntCounter,
    optimization_errors: IntCounterVec,
    model_version_info: GaugeVec,
}

impl OptimizerMetricsInner {
    fn new() -> Self {
        Self {
            optimization_latency_seconds: register_histogram!(
                "adoptima_optimization_latency_seconds",
                "Time spent running one budget optimization",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register optimization_latency_seconds"),

            candidates_evaluated: register_int_counter!(
                "adoptima_candidates_evaluated_total",
                "Candidate allocations scored by the predictor"
            )
            .expect("Failed to register candidates_evaluated"),

            candidates_rejected: register_int_counter!(
                "adoptima_candidates_rejected_total",
                "Grid points discarded by the share constraints"
            )
            .expect("Failed to register candidates_rejected"),

            optimizations: register_int_counter!(
                "adoptima_optimizations_total",
                "Completed optimizations"
            )
            .expect("Failed to register optimizations"),

            optimization_errors: register_int_counter_vec!(
                "adoptima_optimization_errors_total",
                "Failed optimizations by error kind",
                &["kind"]
            )
            .expect("Failed to register optimization_errors"),

            model_version_info: register_gauge_vec!(
                "adoptima_model_version_info",
                "Information about the currently loaded revenue model",
                &["version", "kind"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Optimizer metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct OptimizerMetrics {
    _private: (),
}

impl Default for OptimizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OptimizerMetricsInner {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new)
    }

    /// Record a finished optimization
    pub fn record_optimization(&self, result: &OptimizationResult, duration_secs: f64) {
        let inner = self.inner();
        inner.optimization_latency_seconds.observe(duration_secs);
        inner.candidates_evaluated.inc_by(result.candidates_evaluated as u64);
        inner.candidates_rejected.inc_by(result.candidates_rejected as u64);
        inner.optimizations.inc();
    }

    /// Record a failed optimization
    pub fn inc_optimization_errors(&self, kind: &str) {
        self.inner().optimization_errors.with_label_values(&[kind]).inc();
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str, kind: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, kind])
            .set(1.0);
    }

    pub fn optimizations_total(&self) -> u64 {
        self.inner().optimizations.get()
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a completed optimization
    pub fn log_optimization(&self, result: &OptimizationResult, model_version: &str) {
        info!(
            event = "optimization_completed",
            instance = %self.instance,
            scenario = %result.scenario,
            total_budget = result.total_budget,
            current_roi = result.current_roi,
            optimized_roi = result.optimized_roi,
            revenue_improvement = result.revenue_improvement,
            candidates_evaluated = result.candidates_evaluated,
            model_version = %model_version,
            "Budget optimization completed"
        );
    }

    /// Log a failed optimization
    pub fn log_optimization_failure(&self, kind: &str, message: &str) {
        warn!(
            event = "optimization_failed",
            instance = %self.instance,
            kind = %kind,
            error = %message,
            "Budget optimization failed"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            model_version = %model_version,
            "Optimizer service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Optimizer service shutting down"
        );
    }
}
