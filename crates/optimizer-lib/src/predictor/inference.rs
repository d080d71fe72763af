//! ONNX inference using tract
//!
//! Runs an exported regression model (one revenue output per row) through
//! tract-onnx. The model carries no feature names, so the schema it was
//! trained on is supplied alongside it.

use super::Predictor;
use crate::models::{FeatureSchema, FeatureVector};
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based revenue predictor
pub struct OnnxPredictor {
    model: TractModel,
    version: String,
    schema: FeatureSchema,
}

impl OnnxPredictor {
    /// Create a predictor from model bytes and the schema it was trained on
    pub fn new(model_bytes: &[u8], schema: FeatureSchema, version: impl Into<String>) -> Result<Self> {
        let model = Self::load_model(model_bytes, schema.len())?;
        Ok(Self {
            model,
            version: version.into(),
            schema,
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], num_features: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    /// Convert feature vector to tensor input
    fn features_to_tensor(&self, features: &FeatureVector) -> Result<Tensor> {
        let data: Vec<f32> = features.as_slice().iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.schema.len()), data)
            .context("Failed to shape input tensor")?;
        Ok(array.into())
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.schema.len() {
            anyhow::bail!(
                "Feature vector has {} values, model expects {}",
                features.len(),
                self.schema.len()
            );
        }

        let start = Instant::now();
        let input = self.features_to_tensor(features)?;

        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let revenue = output
            .to_array_view::<f32>()?
            .iter()
            .next()
            .copied()
            .context("Model output is empty")?;

        let elapsed = start.elapsed();

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(revenue as f64)
    }

    fn model_version(&self) -> &str {
        &self.version
    }
}
