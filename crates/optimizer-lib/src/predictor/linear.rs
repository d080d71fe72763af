//! Linear revenue model loaded from a JSON artifact

use super::Predictor;
use crate::models::{FeatureSchema, FeatureVector};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Held-out evaluation metrics recorded at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
}

/// Serialized linear model as written by the training pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub feature_names: FeatureSchema,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<ModelPerformance>,
}

/// Predicts `intercept + coefficients · features`
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    version: String,
    schema: FeatureSchema,
    intercept: f64,
    coefficients: Vec<f64>,
    performance: Option<ModelPerformance>,
}

impl LinearPredictor {
    pub fn new(
        version: impl Into<String>,
        schema: FeatureSchema,
        intercept: f64,
        coefficients: Vec<f64>,
    ) -> Result<Self> {
        if coefficients.len() != schema.len() {
            anyhow::bail!(
                "Model has {} coefficients but schema has {} features",
                coefficients.len(),
                schema.len()
            );
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            anyhow::bail!("Model parameters must be finite");
        }
        Ok(Self {
            version: version.into(),
            schema,
            intercept,
            coefficients,
            performance: None,
        })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let mut predictor = Self::new(
            artifact.version,
            artifact.feature_names,
            artifact.intercept,
            artifact.coefficients,
        )?;
        predictor.performance = artifact.performance;
        Ok(predictor)
    }

    /// Parse a JSON artifact
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).context("Failed to parse linear model artifact")?;
        Self::from_artifact(artifact)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn performance(&self) -> Option<&ModelPerformance> {
        self.performance.as_ref()
    }
}

impl Predictor for LinearPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            anyhow::bail!(
                "Feature vector has {} values, expected {}",
                features.len(),
                self.coefficients.len()
            );
        }
        let dot: f64 = features
            .as_slice()
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum();
        Ok(self.intercept + dot)
    }

    fn model_version(&self) -> &str {
        &self.version
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        let total: f64 = self.coefficients.iter().map(|c| c.abs()).sum();
        if total == 0.0 {
            return None;
        }
        Some(self.coefficients.iter().map(|c| c.abs() / total).collect())
    }
}
