//! Budget allocation optimizer library
//!
//! This crate provides the core functionality for:
//! - Feature synthesis from candidate channel allocations
//! - Revenue prediction through a pluggable trained model
//! - Constrained grid search for the ROI-maximizing allocation
//! - Result assembly, insights and scenario comparison
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod optimizer;
pub mod predictor;

pub use error::{EvaluationStage, OptimizerError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{OptimizerMetrics, StructuredLogger};
pub use optimizer::{AllocationOptimizer, OptimizationInsights, SearchSpace};
pub use predictor::{FeatureSynthesizer, Predictor};
