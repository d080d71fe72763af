//! Grid search for the ROI-maximizing allocation

use super::grid::SearchSpace;
use super::result::{assemble, Evaluation, SearchCounts};
use crate::error::{EvaluationStage, OptimizerError};
use crate::models::{Allocation, FeatureSchema, OptimizationResult, Scenario};
use crate::predictor::{FeatureSynthesizer, Predictor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Evaluates candidate allocations against a trained predictor
///
/// The predictor is borrowed read-only for the whole search.
pub struct AllocationOptimizer<'a, P: Predictor + ?Sized> {
    predictor: &'a P,
    synthesizer: FeatureSynthesizer,
    space: SearchSpace,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, P: Predictor + ?Sized> AllocationOptimizer<'a, P> {
    pub fn new(predictor: &'a P) -> Self {
        Self {
            predictor,
            synthesizer: FeatureSynthesizer::new(),
            space: SearchSpace::default(),
            cancel: None,
        }
    }

    pub fn with_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    /// Stop before the next candidate once `flag` is set
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        matches!(self.cancel, Some(flag) if flag.load(Ordering::Relaxed))
    }

    /// Predict revenue and ROI for one allocation
    pub fn evaluate(
        &self,
        allocation: &Allocation,
        total_budget: f64,
        schema: &FeatureSchema,
        scenario: Scenario,
        stage: EvaluationStage,
    ) -> Result<Evaluation, OptimizerError> {
        let features = self.synthesizer.synthesize(allocation, schema, scenario)?;
        let revenue = self
            .predictor
            .predict(&features)
            .map_err(|e| OptimizerError::failed(stage, e))?;
        if !revenue.is_finite() {
            return Err(OptimizerError::failed(
                stage,
                anyhow::anyhow!("predictor returned non-finite revenue {}", revenue),
            ));
        }
        Ok(Evaluation {
            allocation: *allocation,
            revenue,
            roi: revenue / total_budget,
        })
    }

    /// Find the allocation with the highest predicted ROI
    ///
    /// The current allocation seeds the search, and a candidate replaces the
    /// best so far only when its ROI is strictly greater, so earlier grid
    /// points win ties.
    pub fn optimize(
        &self,
        current: &Allocation,
        total_budget: f64,
        schema: &FeatureSchema,
        scenario: Scenario,
    ) -> Result<OptimizationResult, OptimizerError> {
        validate_inputs(current, total_budget, schema)?;
        let start = Instant::now();

        let baseline = self.evaluate(current, total_budget, schema, scenario, EvaluationStage::Baseline)?;
        let candidates = self.space.generate_candidates()?;
        debug!(
            scenario = %scenario,
            accepted = candidates.accepted.len(),
            rejected = candidates.rejected,
            "Grid generated"
        );

        let mut best = baseline;
        for (index, shares) in candidates.accepted.iter().enumerate() {
            if self.cancelled() {
                return Err(OptimizerError::Cancelled { evaluated: index });
            }
            let allocation = Allocation::from_shares(*shares, total_budget);
            let candidate = self.evaluate(
                &allocation,
                total_budget,
                schema,
                scenario,
                EvaluationStage::Candidate { index },
            )?;
            if candidate.roi > best.roi {
                best = candidate;
            }
        }

        let counts = SearchCounts {
            evaluated: candidates.accepted.len(),
            rejected: candidates.rejected,
        };
        let result = assemble(scenario, total_budget, &baseline, &best, counts);

        info!(
            scenario = %scenario,
            model_version = self.predictor.model_version(),
            baseline_roi = result.current_roi,
            optimized_roi = result.optimized_roi,
            evaluated = counts.evaluated,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Optimization completed"
        );

        Ok(result)
    }
}

fn validate_inputs(
    current: &Allocation,
    total_budget: f64,
    schema: &FeatureSchema,
) -> Result<(), OptimizerError> {
    if !total_budget.is_finite() || total_budget <= 0.0 {
        return Err(OptimizerError::invalid(format!(
            "total budget must be positive, got {}",
            total_budget
        )));
    }
    if schema.is_empty() {
        return Err(OptimizerError::invalid("feature schema is empty"));
    }
    if let Some((channel, amount)) = current.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
        return Err(OptimizerError::invalid(format!(
            "allocation for '{}' must be a non-negative number, got {}",
            channel, amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, FeatureVector};
    use crate::predictor::LinearPredictor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the sum of the feature vector
    struct SumPredictor;

    impl Predictor for SumPredictor {
        fn predict(&self, features: &FeatureVector) -> anyhow::Result<f64> {
            Ok(features.as_slice().iter().sum())
        }

        fn model_version(&self) -> &str {
            "sum"
        }
    }

    /// Counts calls and fails on the n-th one
    struct FailingPredictor {
        calls: AtomicUsize,
        fail_at: usize,
    }

    impl Predictor for FailingPredictor {
        fn predict(&self, _features: &FeatureVector) -> anyhow::Result<f64> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == self.fail_at {
                anyhow::bail!("model unavailable");
            }
            Ok(1.0)
        }

        fn model_version(&self) -> &str {
            "failing"
        }
    }

    struct ConstantPredictor(f64);

    impl Predictor for ConstantPredictor {
        fn predict(&self, _features: &FeatureVector) -> anyhow::Result<f64> {
            Ok(self.0)
        }

        fn model_version(&self) -> &str {
            "constant"
        }
    }

    fn current() -> Allocation {
        Allocation::new(20.0, 30.0, 10.0, 15.0)
    }

    fn weighted_spend_model() -> LinearPredictor {
        let schema = FeatureSchema::standard();
        let mut coefficients = vec![0.0; schema.len()];
        coefficients[0] = 1.0; // social
        coefficients[1] = 2.0; // search
        coefficients[2] = 1.5; // email
        coefficients[3] = 1.2; // promotions
        LinearPredictor::new("weighted", schema, 0.0, coefficients).unwrap()
    }

    fn shares(alloc: &Allocation, total: f64) -> [f64; 4] {
        Channel::ALL.map(|c| alloc.get(c) / total)
    }

    #[test]
    fn test_converges_to_highest_weighted_corner() {
        let model = weighted_spend_model();
        let optimizer = AllocationOptimizer::new(&model);
        let result = optimizer
            .optimize(&current(), 75.0, &FeatureSchema::standard(), Scenario::Normal)
            .unwrap();

        let s = shares(&result.optimized_allocation, 75.0);
        let expected = [0.10, 0.50, 0.20, 0.20];
        for (got, want) in s.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "shares were {:?}", s);
        }
        assert!(result.optimized_roi > result.current_roi);
        assert!(result.revenue_improvement > 0.0);
    }

    #[test]
    fn test_sum_predictor_end_to_end() {
        let schema = FeatureSchema::standard();
        let optimizer = AllocationOptimizer::new(&SumPredictor);
        let result = optimizer
            .optimize(&current(), 75.0, &schema, Scenario::Normal)
            .unwrap();

        let baseline_vec = FeatureSynthesizer::new()
            .synthesize(&current(), &schema, Scenario::Normal)
            .unwrap();
        let baseline_sum: f64 = baseline_vec.as_slice().iter().sum();
        assert_eq!(result.current_revenue, baseline_sum);
        assert_eq!(result.current_roi, baseline_sum / 75.0);
        assert!(result.optimized_roi >= result.current_roi);
        assert_eq!(result.candidates_evaluated + result.candidates_rejected, 196);

        // Every candidate sums to the same value; only rounding separates them
        assert!(
            (result.optimized_revenue - result.current_revenue).abs() < 1e-9,
            "revenue moved from {} to {}",
            result.current_revenue,
            result.optimized_revenue
        );
    }

    #[test]
    fn test_result_within_bounds_and_sums_to_one() {
        let model = weighted_spend_model();
        let space = SearchSpace::default();
        for scenario in Scenario::ALL {
            let result = AllocationOptimizer::new(&model)
                .optimize(&current(), 75.0, &FeatureSchema::standard(), scenario)
                .unwrap();
            let s = shares(&result.optimized_allocation, 75.0);
            assert!(space.admits(&s), "{:?} out of bounds", s);
        }
    }

    #[test]
    fn test_custom_space_bounds_result() {
        use crate::optimizer::ShareBounds;

        // Social max 0.42 is off the 0.05 lattice, so its last step is 0.07
        let space = SearchSpace {
            bounds: [
                ShareBounds::new(0.30, 0.42),
                ShareBounds::new(0.20, 0.35),
                ShareBounds::new(0.05, 0.20),
                ShareBounds::new(0.10, 0.30),
            ],
            step: 0.05,
        };
        let model = weighted_spend_model();
        let baseline = Allocation::default_split(75.0);
        let result = AllocationOptimizer::new(&model)
            .with_space(space)
            .optimize(&baseline, 75.0, &FeatureSchema::standard(), Scenario::Normal)
            .unwrap();

        let s = shares(&result.optimized_allocation, 75.0);
        assert!(space.admits(&s), "{:?} outside the narrowed space", s);
        let expected = [0.30, 0.35, 0.20, 0.15];
        for (got, want) in s.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "shares were {:?}", s);
        }

        let set = space.generate_candidates().unwrap();
        assert_eq!(result.candidates_evaluated, set.accepted.len());
        assert_eq!(set.raw_len(), 3 * 4 * 4);
        assert!(set.accepted.iter().any(|c| c[0] == 0.42));
    }

    #[test]
    fn test_cancel_flag_stops_search() {
        let predictor = FailingPredictor {
            calls: AtomicUsize::new(0),
            fail_at: usize::MAX,
        };
        let flag = AtomicBool::new(true);
        let err = AllocationOptimizer::new(&predictor)
            .with_cancel_flag(&flag)
            .optimize(&current(), 75.0, &FeatureSchema::standard(), Scenario::Normal)
            .unwrap_err();

        assert!(matches!(err, OptimizerError::Cancelled { evaluated: 0 }));
        // only the baseline was scored
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unset_cancel_flag_runs_to_completion() {
        let model = weighted_spend_model();
        let flag = AtomicBool::new(false);
        let result = AllocationOptimizer::new(&model)
            .with_cancel_flag(&flag)
            .optimize(&current(), 75.0, &FeatureSchema::standard(), Scenario::Normal)
            .unwrap();
        assert_eq!(result.candidates_evaluated + result.candidates_rejected, 196);
    }

    #[test]
    fn test_no_improvement_keeps_baseline() {
        let optimizer = AllocationOptimizer::new(&ConstantPredictor(100.0));
        let result = optimizer
            .optimize(&current(), 75.0, &FeatureSchema::standard(), Scenario::Holiday)
            .unwrap();
        assert_eq!(result.optimized_allocation, current());
        assert_eq!(result.revenue_improvement, 0.0);
        assert_eq!(result.roi_improvement, 0.0);
    }

    #[test]
    fn test_idempotent() {
        let model = weighted_spend_model();
        let optimizer = AllocationOptimizer::new(&model);
        let schema = FeatureSchema::standard();
        let a = optimizer
            .optimize(&current(), 75.0, &schema, Scenario::CompetitorHigh)
            .unwrap();
        let b = optimizer
            .optimize(&current(), 75.0, &schema, Scenario::CompetitorHigh)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.optimized_roi.to_bits(), b.optimized_roi.to_bits());
    }

    #[test]
    fn test_non_positive_budget_rejected_before_prediction() {
        let predictor = FailingPredictor {
            calls: AtomicUsize::new(0),
            fail_at: usize::MAX,
        };
        let optimizer = AllocationOptimizer::new(&predictor);
        for budget in [0.0, -75.0, f64::NAN] {
            let err = optimizer
                .optimize(&current(), budget, &FeatureSchema::standard(), Scenario::Normal)
                .unwrap_err();
            assert!(matches!(err, OptimizerError::InvalidInput(_)));
        }
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_allocation_with_ratio_features() {
        let optimizer = AllocationOptimizer::new(&SumPredictor);
        let err = optimizer
            .optimize(
                &Allocation::new(0.0, 0.0, 0.0, 0.0),
                75.0,
                &FeatureSchema::standard(),
                Scenario::Normal,
            )
            .unwrap_err();
        assert!(matches!(err, OptimizerError::DivisionByZero { .. }));
    }

    #[test]
    fn test_baseline_failure_propagates() {
        let predictor = FailingPredictor {
            calls: AtomicUsize::new(0),
            fail_at: 0,
        };
        let err = AllocationOptimizer::new(&predictor)
            .optimize(&current(), 75.0, &FeatureSchema::standard(), Scenario::Normal)
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizerError::OptimizationFailed {
                stage: EvaluationStage::Baseline,
                ..
            }
        ));
    }

    #[test]
    fn test_candidate_failure_aborts_search() {
        let predictor = FailingPredictor {
            calls: AtomicUsize::new(0),
            fail_at: 5,
        };
        let err = AllocationOptimizer::new(&predictor)
            .optimize(&current(), 75.0, &FeatureSchema::standard(), Scenario::Normal)
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizerError::OptimizationFailed {
                stage: EvaluationStage::Candidate { index: 4 },
                ..
            }
        ));
        // nothing evaluated past the failure
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_non_finite_prediction_is_failure() {
        let err = AllocationOptimizer::new(&ConstantPredictor(f64::NAN))
            .optimize(&current(), 75.0, &FeatureSchema::standard(), Scenario::Normal)
            .unwrap_err();
        assert_eq!(err.kind(), "optimization_failed");
    }

    #[test]
    fn test_ties_keep_earliest_candidate() {
        // Rewards a fixed email share, so every such point ties
        struct EmailShare;
        impl Predictor for EmailShare {
            fn predict(&self, features: &FeatureVector) -> anyhow::Result<f64> {
                let ratio = features.as_slice()[9];
                Ok(if (ratio - 0.20).abs() < 1e-9 { 1000.0 } else { 0.0 })
            }
            fn model_version(&self) -> &str {
                "email"
            }
        }

        let result = AllocationOptimizer::new(&EmailShare)
            .optimize(&current(), 75.0, &FeatureSchema::standard(), Scenario::Normal)
            .unwrap();
        let s = shares(&result.optimized_allocation, 75.0);
        // lowest social, then lowest search, with email at 0.20 and promotions feasible
        assert!((s[0] - 0.10).abs() < 1e-9, "{:?}", s);
        assert!((s[1] - 0.40).abs() < 1e-9, "{:?}", s);
        assert!((s[2] - 0.20).abs() < 1e-9, "{:?}", s);
    }
}
