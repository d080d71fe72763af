//! Result assembly and optimization insights

use crate::models::{Allocation, Channel, OptimizationResult, Scenario};
use serde::{Deserialize, Serialize};

/// Channel changes smaller than this percentage are not reported
pub const SIGNIFICANT_CHANGE_PCT: f64 = 5.0;

/// Predicted outcome of one allocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub allocation: Allocation,
    pub revenue: f64,
    pub roi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCounts {
    pub evaluated: usize,
    pub rejected: usize,
}

/// Package baseline and best-found evaluations with their deltas
pub fn assemble(
    scenario: Scenario,
    total_budget: f64,
    baseline: &Evaluation,
    best: &Evaluation,
    counts: SearchCounts,
) -> OptimizationResult {
    OptimizationResult {
        scenario,
        total_budget,
        current_allocation: baseline.allocation,
        optimized_allocation: best.allocation,
        current_revenue: baseline.revenue,
        optimized_revenue: best.revenue,
        revenue_improvement: best.revenue - baseline.revenue,
        current_roi: baseline.roi,
        optimized_roi: best.roi,
        roi_improvement: best.roi - baseline.roi,
        candidates_evaluated: counts.evaluated,
        candidates_rejected: counts.rejected,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Increase,
    Decrease,
}

/// Suggested move for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecommendation {
    pub channel: Channel,
    pub direction: ChangeDirection,
    pub current_amount: f64,
    pub optimized_amount: f64,
    /// Absolute amount moved
    pub change_amount: f64,
    /// Change relative to the current amount; absent when it was zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
}

/// Presentation-ready summary of an [`OptimizationResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationInsights {
    pub revenue_change_pct: Option<f64>,
    pub roi_change_pct: Option<f64>,
    pub already_optimal: bool,
    pub recommendations: Vec<ChannelRecommendation>,
}

impl OptimizationInsights {
    pub fn from_result(result: &OptimizationResult) -> Self {
        let recommendations = Channel::ALL
            .into_iter()
            .filter_map(|channel| {
                recommend(
                    channel,
                    result.current_allocation.get(channel),
                    result.optimized_allocation.get(channel),
                )
            })
            .collect();

        Self {
            revenue_change_pct: relative_pct(result.revenue_improvement, result.current_revenue),
            roi_change_pct: relative_pct(result.roi_improvement, result.current_roi),
            already_optimal: result.roi_improvement <= 0.0,
            recommendations,
        }
    }

    /// One line of text per insight
    pub fn summary_lines(&self, result: &OptimizationResult) -> Vec<String> {
        let mut lines = Vec::new();

        if result.revenue_improvement > 0.0 {
            lines.push(match self.revenue_change_pct {
                Some(pct) => format!(
                    "Revenue boost: optimized allocation could increase revenue by {:.0} ({:.1}%)",
                    result.revenue_improvement, pct
                ),
                None => format!(
                    "Revenue boost: optimized allocation could increase revenue by {:.0}",
                    result.revenue_improvement
                ),
            });
        } else {
            lines.push(format!(
                "Revenue impact: current allocation is already well-optimized (change {:.0})",
                result.revenue_improvement
            ));
        }

        if result.roi_improvement > 0.0 {
            lines.push(match self.roi_change_pct {
                Some(pct) => format!(
                    "ROI improvement: expected ROI increase of {:.3} ({:.1}%)",
                    result.roi_improvement, pct
                ),
                None => format!("ROI improvement: expected ROI increase of {:.3}", result.roi_improvement),
            });
        } else {
            lines.push(format!(
                "ROI status: current ROI is already optimal (change {:.3})",
                result.roi_improvement
            ));
        }

        for rec in &self.recommendations {
            let verb = match rec.direction {
                ChangeDirection::Increase => "Increase",
                ChangeDirection::Decrease => "Decrease",
            };
            lines.push(match rec.change_pct {
                Some(pct) => format!(
                    "{}: {} by {:.1}% ({:.0})",
                    rec.channel.label(),
                    verb,
                    pct.abs(),
                    rec.change_amount
                ),
                None => format!("{}: {} by {:.0}", rec.channel.label(), verb, rec.change_amount),
            });
        }

        lines
    }
}

fn relative_pct(delta: f64, base: f64) -> Option<f64> {
    if base == 0.0 {
        None
    } else {
        Some(delta / base * 100.0)
    }
}

fn recommend(channel: Channel, current: f64, optimized: f64) -> Option<ChannelRecommendation> {
    let delta = optimized - current;
    let direction = if delta > 0.0 {
        ChangeDirection::Increase
    } else {
        ChangeDirection::Decrease
    };

    if current == 0.0 {
        return (optimized > 0.0).then_some(ChannelRecommendation {
            channel,
            direction: ChangeDirection::Increase,
            current_amount: current,
            optimized_amount: optimized,
            change_amount: optimized,
            change_pct: None,
        });
    }

    let pct = delta / current * 100.0;
    (pct.abs() > SIGNIFICANT_CHANGE_PCT).then_some(ChannelRecommendation {
        channel,
        direction,
        current_amount: current,
        optimized_amount: optimized,
        change_amount: delta.abs(),
        change_pct: Some(pct),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(alloc: Allocation, revenue: f64, total: f64) -> Evaluation {
        Evaluation {
            allocation: alloc,
            revenue,
            roi: revenue / total,
        }
    }

    fn sample_result() -> OptimizationResult {
        let baseline = eval(Allocation::new(20.0, 30.0, 10.0, 15.0), 150.0, 75.0);
        let best = eval(Allocation::new(7.5, 37.5, 15.0, 15.0), 180.0, 75.0);
        assemble(
            Scenario::Normal,
            75.0,
            &baseline,
            &best,
            SearchCounts {
                evaluated: 100,
                rejected: 96,
            },
        )
    }

    #[test]
    fn test_assemble_deltas() {
        let r = sample_result();
        assert_eq!(r.revenue_improvement, 30.0);
        assert!((r.roi_improvement - 0.4).abs() < 1e-12);
        assert_eq!(r.current_roi, 2.0);
        assert_eq!(r.candidates_evaluated, 100);
    }

    #[test]
    fn test_insights_percentages() {
        let r = sample_result();
        let insights = OptimizationInsights::from_result(&r);
        assert!((insights.revenue_change_pct.unwrap() - 20.0).abs() < 1e-9);
        assert!((insights.roi_change_pct.unwrap() - 20.0).abs() < 1e-9);
        assert!(!insights.already_optimal);
    }

    #[test]
    fn test_only_significant_changes_recommended() {
        let r = sample_result();
        let insights = OptimizationInsights::from_result(&r);
        let channels: Vec<Channel> = insights.recommendations.iter().map(|r| r.channel).collect();
        // promotions unchanged
        assert_eq!(channels, vec![Channel::SocialMedia, Channel::SearchAds, Channel::Email]);

        let social = &insights.recommendations[0];
        assert_eq!(social.direction, ChangeDirection::Decrease);
        assert_eq!(social.change_amount, 12.5);
        assert!((social.change_pct.unwrap() + 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_current_channel() {
        let rec = recommend(Channel::Email, 0.0, 10.0).unwrap();
        assert_eq!(rec.direction, ChangeDirection::Increase);
        assert!(rec.change_pct.is_none());
        assert!(recommend(Channel::Email, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_summary_lines() {
        let r = sample_result();
        let insights = OptimizationInsights::from_result(&r);
        let lines = insights.summary_lines(&r);
        assert!(lines[0].starts_with("Revenue boost"));
        assert!(lines[1].starts_with("ROI improvement"));
        assert_eq!(lines.len(), 2 + insights.recommendations.len());
    }

    #[test]
    fn test_zero_baseline_revenue() {
        let baseline = eval(Allocation::new(20.0, 30.0, 10.0, 15.0), 0.0, 75.0);
        let r = assemble(
            Scenario::Normal,
            75.0,
            &baseline,
            &baseline,
            SearchCounts {
                evaluated: 0,
                rejected: 0,
            },
        );
        let insights = OptimizationInsights::from_result(&r);
        assert!(insights.revenue_change_pct.is_none());
        assert!(insights.already_optimal);
        assert!(insights.recommendations.is_empty());
    }
}
