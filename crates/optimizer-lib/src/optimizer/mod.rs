//! Budget allocation search
//!
//! Enumerates a bounded share grid, scores each admissible allocation with
//! the trained predictor and keeps the highest predicted ROI.

mod grid;
mod result;
mod scenarios;
mod search;

pub use grid::{CandidateSet, GridAxis, SearchSpace, ShareBounds, DEFAULT_STEP, SHARE_TOLERANCE};
pub use result::{
    assemble, ChangeDirection, ChannelRecommendation, Evaluation, OptimizationInsights,
    SearchCounts, SIGNIFICANT_CHANGE_PCT,
};
pub use scenarios::{compare_scenarios, ScenarioComparison, ScenarioOutcome};
pub use search::AllocationOptimizer;
