//! Scenario comparison

use super::AllocationOptimizer;
use crate::error::OptimizerError;
use crate::models::{Allocation, FeatureSchema, OptimizationResult, Scenario};
use crate::predictor::Predictor;
use serde::{Deserialize, Serialize};

/// Optimized outcome under one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub optimized_revenue: f64,
    pub optimized_roi: f64,
    pub result: OptimizationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub total_budget: f64,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl ScenarioComparison {
    /// Scenario with the highest optimized ROI; the first listed wins ties
    pub fn best(&self) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().fold(None, |best, o| match best {
            Some(b) if b.optimized_roi >= o.optimized_roi => Some(b),
            _ => Some(o),
        })
    }
}

/// Run the optimization once per scenario; any failure aborts the comparison
pub fn compare_scenarios<P: Predictor + ?Sized>(
    optimizer: &AllocationOptimizer<'_, P>,
    current: &Allocation,
    total_budget: f64,
    schema: &FeatureSchema,
    scenarios: &[Scenario],
) -> Result<ScenarioComparison, OptimizerError> {
    if scenarios.is_empty() {
        return Err(OptimizerError::invalid("no scenarios to compare"));
    }

    let outcomes = scenarios
        .iter()
        .map(|&scenario| {
            let result = optimizer.optimize(current, total_budget, schema, scenario)?;
            Ok(ScenarioOutcome {
                scenario,
                optimized_revenue: result.optimized_revenue,
                optimized_roi: result.optimized_roi,
                result,
            })
        })
        .collect::<Result<Vec<_>, OptimizerError>>()?;

    Ok(ScenarioComparison {
        total_budget,
        outcomes,
    })
}
