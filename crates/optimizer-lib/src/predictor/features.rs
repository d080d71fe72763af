//! Feature synthesis for optimization-time inference
//!
//! Builds the model input for a candidate allocation. Each schema position is
//! resolved by the first matching rule in an ordered table keyed on the
//! feature name, so every rule can be inspected and tested on its own.

use crate::error::OptimizerError;
use crate::models::{Allocation, Channel, FeatureSchema, FeatureVector, Scenario};

/// Value used for features that are unknown at optimization time
pub const NEUTRAL_DEFAULT: f64 = 0.5;

pub const COMPETITOR_ACTIVITY_FEATURE: &str = "Competitor_Activity_Index";
pub const MONTH_FEATURE: &str = "Month_Num";
pub const SEASON_FEATURE: &str = "Season_Encoded";

/// Inputs visible to a synthesis rule
pub struct SynthesisContext<'a> {
    pub allocation: &'a Allocation,
    pub scenario: Scenario,
}

type Matcher = fn(&str) -> bool;
type ValueFn = fn(&SynthesisContext<'_>, &str) -> Result<f64, OptimizerError>;

/// One entry of the synthesis table
#[derive(Clone, Copy)]
pub struct FeatureRule {
    pub name: &'static str,
    matches: Matcher,
    value: ValueFn,
}

impl FeatureRule {
    pub const fn new(name: &'static str, matches: Matcher, value: ValueFn) -> Self {
        Self {
            name,
            matches,
            value,
        }
    }

    pub fn matches(&self, feature: &str) -> bool {
        (self.matches)(feature)
    }

    pub fn evaluate(&self, ctx: &SynthesisContext<'_>, feature: &str) -> Result<f64, OptimizerError> {
        (self.value)(ctx, feature)
    }
}

impl std::fmt::Debug for FeatureRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRule").field("name", &self.name).finish()
    }
}

fn is_spend(feature: &str) -> bool {
    Channel::from_spend_feature(feature).is_some()
}

fn spend_value(ctx: &SynthesisContext<'_>, feature: &str) -> Result<f64, OptimizerError> {
    Channel::from_spend_feature(feature)
        .map(|c| ctx.allocation.get(c))
        .ok_or_else(|| OptimizerError::invalid(format!("'{}' is not a spend feature", feature)))
}

fn is_competitor_activity(feature: &str) -> bool {
    feature == COMPETITOR_ACTIVITY_FEATURE
}

fn is_month(feature: &str) -> bool {
    feature == MONTH_FEATURE
}

fn is_season(feature: &str) -> bool {
    feature == SEASON_FEATURE
}

fn is_ratio(feature: &str) -> bool {
    feature.contains("Ratio") && Channel::mentioned_in(feature).is_some()
}

fn ratio_value(ctx: &SynthesisContext<'_>, feature: &str) -> Result<f64, OptimizerError> {
    let channel = Channel::mentioned_in(feature)
        .ok_or_else(|| OptimizerError::invalid(format!("'{}' names no channel", feature)))?;
    let total = ctx.allocation.total();
    if total == 0.0 {
        return Err(OptimizerError::DivisionByZero {
            feature: feature.to_string(),
        });
    }
    Ok(ctx.allocation.get(channel) / total)
}

fn any(_: &str) -> bool {
    true
}

/// Standard table, evaluated top to bottom. The last rule always matches.
pub const STANDARD_RULES: &[FeatureRule] = &[
    FeatureRule::new("channel_spend", is_spend, spend_value),
    FeatureRule::new("competitor_activity", is_competitor_activity, |ctx, _| {
        Ok(ctx.scenario.competitor_activity())
    }),
    FeatureRule::new("month_number", is_month, |ctx, _| Ok(ctx.scenario.month_number())),
    FeatureRule::new("season_encoding", is_season, |ctx, _| Ok(ctx.scenario.season_code())),
    FeatureRule::new("channel_ratio", is_ratio, ratio_value),
    FeatureRule::new("neutral_default", any, |_, _| Ok(NEUTRAL_DEFAULT)),
];

/// Maps allocations plus scenario context onto the trained feature schema
#[derive(Debug, Clone)]
pub struct FeatureSynthesizer {
    rules: Vec<FeatureRule>,
}

impl Default for FeatureSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureSynthesizer {
    pub fn new() -> Self {
        Self {
            rules: STANDARD_RULES.to_vec(),
        }
    }

    /// Use a custom table. A catch-all rule is appended so the mapping stays total.
    pub fn with_rules(mut rules: Vec<FeatureRule>) -> Self {
        rules.push(FeatureRule::new("neutral_default", any, |_, _| Ok(NEUTRAL_DEFAULT)));
        Self { rules }
    }

    /// Name of the rule that resolves `feature`
    pub fn rule_for(&self, feature: &str) -> &'static str {
        self.find_rule(feature).map(|r| r.name).unwrap_or("unmatched")
    }

    fn find_rule(&self, feature: &str) -> Option<&FeatureRule> {
        self.rules.iter().find(|r| r.matches(feature))
    }

    /// Build the feature vector for one allocation
    pub fn synthesize(
        &self,
        allocation: &Allocation,
        schema: &FeatureSchema,
        scenario: Scenario,
    ) -> Result<FeatureVector, OptimizerError> {
        let ctx = SynthesisContext {
            allocation,
            scenario,
        };

        let values = schema
            .names()
            .iter()
            .map(|name| match self.find_rule(name) {
                Some(rule) => rule.evaluate(&ctx, name),
                None => Ok(NEUTRAL_DEFAULT),
            })
            .collect::<Result<Vec<f64>, _>>()?;

        Ok(FeatureVector::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> Allocation {
        Allocation::new(20.0, 30.0, 10.0, 15.0)
    }

    #[test]
    fn test_standard_schema_values() {
        let synth = FeatureSynthesizer::new();
        let schema = FeatureSchema::standard();
        let v = synth.synthesize(&baseline(), &schema, Scenario::Normal).unwrap();
        let v = v.as_slice();

        assert_eq!(v.len(), schema.len());
        assert_eq!(&v[0..4], &[20.0, 30.0, 10.0, 15.0]);
        assert_eq!(v[4], 50.0);
        assert_eq!(v[5], 6.0);
        assert_eq!(v[6], 1.0);
        assert!((v[7] - 20.0 / 75.0).abs() < 1e-12);
        assert!((v[8] - 30.0 / 75.0).abs() < 1e-12);
        assert!((v[9] - 10.0 / 75.0).abs() < 1e-12);
        assert!((v[10] - 15.0 / 75.0).abs() < 1e-12);
        assert!(v[11..].iter().all(|x| *x == NEUTRAL_DEFAULT));
    }

    #[test]
    fn test_ratios_sum_to_one() {
        let synth = FeatureSynthesizer::new();
        let schema = FeatureSchema::standard();
        for alloc in [
            baseline(),
            Allocation::new(1.0, 0.0, 0.0, 0.0),
            Allocation::new(0.1, 1e6, 3.3, 7.7),
        ] {
            let v = synth.synthesize(&alloc, &schema, Scenario::Holiday).unwrap();
            let sum: f64 = v.as_slice()[7..11].iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "ratios summed to {}", sum);
        }
    }

    #[test]
    fn test_scenarios_change_context_only() {
        let synth = FeatureSynthesizer::new();
        let schema = FeatureSchema::standard();
        let normal = synth.synthesize(&baseline(), &schema, Scenario::Normal).unwrap();
        let holiday = synth.synthesize(&baseline(), &schema, Scenario::Holiday).unwrap();
        let competitor = synth
            .synthesize(&baseline(), &schema, Scenario::CompetitorHigh)
            .unwrap();

        let context = [4usize, 5, 6];
        for i in 0..schema.len() {
            if context.contains(&i) {
                continue;
            }
            assert_eq!(normal.as_slice()[i], holiday.as_slice()[i], "position {}", i);
            assert_eq!(normal.as_slice()[i], competitor.as_slice()[i], "position {}", i);
        }

        assert_eq!(&holiday.as_slice()[4..7], &[50.0, 12.0, 0.0]);
        assert_eq!(&competitor.as_slice()[4..7], &[60.0, 6.0, 1.0]);
    }

    #[test]
    fn test_deterministic_output() {
        let synth = FeatureSynthesizer::new();
        let schema = FeatureSchema::standard();
        let alloc = Allocation::new(7.123, 19.5, 0.3333, 48.0);
        let a = synth.synthesize(&alloc, &schema, Scenario::CompetitorHigh).unwrap();
        let b = synth.synthesize(&alloc, &schema, Scenario::CompetitorHigh).unwrap();
        let bits = |v: &FeatureVector| v.as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_zero_allocation_ratio_is_division_by_zero() {
        let synth = FeatureSynthesizer::new();
        let schema = FeatureSchema::standard();
        let err = synth
            .synthesize(&Allocation::new(0.0, 0.0, 0.0, 0.0), &schema, Scenario::Normal)
            .unwrap_err();
        assert!(matches!(err, OptimizerError::DivisionByZero { ref feature } if feature == "Social_Spend_Ratio"));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_zero_allocation_without_ratio_features() {
        let synth = FeatureSynthesizer::new();
        let schema = FeatureSchema::new(["Email_Spend", "Month_Num"]).unwrap();
        let v = synth
            .synthesize(&Allocation::new(0.0, 0.0, 0.0, 0.0), &schema, Scenario::Normal)
            .unwrap();
        assert_eq!(v.as_slice(), &[0.0, 6.0]);
    }

    #[test]
    fn test_rule_resolution_order() {
        let synth = FeatureSynthesizer::new();
        assert_eq!(synth.rule_for("Social_Media_Spend"), "channel_spend");
        assert_eq!(synth.rule_for("Competitor_Activity_Index"), "competitor_activity");
        assert_eq!(synth.rule_for("Month_Num"), "month_number");
        assert_eq!(synth.rule_for("Season_Encoded"), "season_encoding");
        assert_eq!(synth.rule_for("Search_Spend_Ratio"), "channel_ratio");
        // ratio without a channel token falls through to the default
        assert_eq!(synth.rule_for("Conversion_Ratio"), "neutral_default");
        assert_eq!(synth.rule_for("Total_Spend_MA3"), "neutral_default");
    }

    #[test]
    fn test_custom_rules_stay_total() {
        let synth = FeatureSynthesizer::with_rules(vec![FeatureRule::new(
            "lag_zero",
            |name| name.ends_with("Lag1"),
            |_, _| Ok(0.0),
        )]);
        let schema = FeatureSchema::new(["Sales_Revenue_Lag1", "Email_Spend"]).unwrap();
        let v = synth.synthesize(&baseline(), &schema, Scenario::Normal).unwrap();
        assert_eq!(v.as_slice(), &[0.0, NEUTRAL_DEFAULT]);
    }
}
