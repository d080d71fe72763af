//! Revenue prediction capability and optimization-time feature synthesis

mod features;
mod inference;
mod linear;
mod loader;

pub use features::{
    FeatureRule, FeatureSynthesizer, SynthesisContext, COMPETITOR_ACTIVITY_FEATURE,
    MONTH_FEATURE, NEUTRAL_DEFAULT, SEASON_FEATURE, STANDARD_RULES,
};
pub use inference::OnnxPredictor;
pub use linear::{LinearPredictor, ModelArtifact, ModelPerformance};
pub use loader::{compute_checksum, load_model, LoadedModel, ModelKind, ModelSource, MAX_MODEL_BYTES};

use crate::models::{Channel, FeatureSchema, FeatureVector};
use anyhow::Result;
use std::collections::BTreeMap;

/// Trait for trained revenue models
///
/// Implementations must be deterministic for a fixed trained state and must
/// not mutate that state while predicting.
pub trait Predictor: Send + Sync {
    /// Predict revenue for one feature vector
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Get current model version
    fn model_version(&self) -> &str;

    /// Relative importance per schema position, if the model exposes it
    fn feature_importance(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Sum feature importances per channel, matching features by channel token.
/// Features naming no channel are ignored.
pub fn channel_effectiveness(schema: &FeatureSchema, importances: &[f64]) -> BTreeMap<Channel, f64> {
    let mut by_channel = BTreeMap::new();
    for (name, importance) in schema.names().iter().zip(importances) {
        if let Some(channel) = Channel::mentioned_in(name) {
            *by_channel.entry(channel).or_insert(0.0) += importance;
        }
    }
    by_channel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_effectiveness_grouping() {
        let schema = FeatureSchema::new([
            "Social_Media_Spend",
            "Social_Spend_Ratio",
            "Email_Spend",
            "Month_Num",
        ])
        .unwrap();
        let eff = channel_effectiveness(&schema, &[0.2, 0.1, 0.3, 0.4]);
        assert_eq!(eff.len(), 2);
        assert!((eff[&Channel::SocialMedia] - 0.3).abs() < 1e-12);
        assert!((eff[&Channel::Email] - 0.3).abs() < 1e-12);
        assert!(!eff.contains_key(&Channel::SearchAds));
    }
}
