//! Error types for budget optimization

use thiserror::Error;

/// Errors surfaced by feature synthesis and allocation search
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Caller supplied a budget, allocation or schema the optimizer cannot use
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A ratio feature was requested while the allocation sums to zero
    #[error("division by zero while computing feature '{feature}': allocation sums to zero")]
    DivisionByZero { feature: String },

    /// The predictor failed (or produced a non-finite value) during evaluation
    #[error("optimization failed during {stage}: {source}")]
    OptimizationFailed {
        stage: EvaluationStage,
        #[source]
        source: anyhow::Error,
    },

    /// The caller gave up on the search before it finished
    #[error("optimization cancelled after {evaluated} candidates")]
    Cancelled { evaluated: usize },
}

impl OptimizerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn failed(stage: EvaluationStage, source: anyhow::Error) -> Self {
        Self::OptimizationFailed { stage, source }
    }

    /// Division by zero is reported to callers as bad input
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::DivisionByZero { .. })
    }

    /// Short machine-readable kind, used for metric labels and API bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::DivisionByZero { .. } => "division_by_zero",
            Self::OptimizationFailed { .. } => "optimization_failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Which evaluation was running when the predictor failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStage {
    Baseline,
    Candidate { index: usize },
}

impl std::fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationStage::Baseline => write!(f, "baseline evaluation"),
            EvaluationStage::Candidate { index } => write!(f, "candidate {} evaluation", index),
        }
    }
}
