//! Model file loading with checksum validation

use super::{LinearPredictor, ModelPerformance, OnnxPredictor, Predictor};
use crate::models::FeatureSchema;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Largest model file accepted (16 MiB)
pub const MAX_MODEL_BYTES: u64 = 16 * 1024 * 1024;

/// Serialized model format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// JSON linear artifact (carries its own schema)
    #[default]
    Linear,
    /// ONNX graph (schema supplied separately)
    Onnx,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Onnx => "onnx",
        }
    }
}

/// Where to load a model from
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub kind: ModelKind,
    pub model_path: PathBuf,
    /// JSON array of feature names; required for ONNX models
    pub schema_path: Option<PathBuf>,
    /// Expected SHA-256 of the model file, hex encoded
    pub expected_sha256: Option<String>,
}

/// A trained predictor together with the schema it consumes
#[derive(Clone)]
pub struct LoadedModel {
    pub predictor: Arc<dyn Predictor>,
    pub schema: FeatureSchema,
    pub kind: ModelKind,
    pub checksum: String,
    pub performance: Option<ModelPerformance>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("version", &self.predictor.model_version())
            .field("kind", &self.kind)
            .field("features", &self.schema.len())
            .field("checksum", &self.checksum)
            .finish()
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Read, validate and instantiate a model
pub fn load_model(source: &ModelSource) -> Result<LoadedModel> {
    let size = std::fs::metadata(&source.model_path)
        .with_context(|| format!("Failed to stat model file {}", source.model_path.display()))?
        .len();
    if size > MAX_MODEL_BYTES {
        anyhow::bail!("Model file is {} bytes, limit is {}", size, MAX_MODEL_BYTES);
    }

    let bytes = std::fs::read(&source.model_path)
        .with_context(|| format!("Failed to read model file {}", source.model_path.display()))?;

    let checksum = compute_checksum(&bytes);
    if let Some(expected) = &source.expected_sha256 {
        if !expected.eq_ignore_ascii_case(&checksum) {
            anyhow::bail!("Checksum mismatch: expected {}, got {}", expected, checksum);
        }
    }

    let loaded = match source.kind {
        ModelKind::Linear => {
            let model = LinearPredictor::from_json(&bytes)?;
            let schema = model.schema().clone();
            let performance = model.performance().cloned();
            LoadedModel {
                predictor: Arc::new(model),
                schema,
                kind: ModelKind::Linear,
                checksum,
                performance,
            }
        }
        ModelKind::Onnx => {
            let schema_path = source
                .schema_path
                .as_ref()
                .context("ONNX models require a feature schema file")?;
            let schema_bytes = std::fs::read(schema_path)
                .with_context(|| format!("Failed to read schema file {}", schema_path.display()))?;
            let schema: FeatureSchema =
                serde_json::from_slice(&schema_bytes).context("Failed to parse feature schema")?;
            let version = format!("onnx-{}", &checksum[..12]);
            let model = OnnxPredictor::new(&bytes, schema.clone(), version)?;
            LoadedModel {
                predictor: Arc::new(model),
                schema,
                kind: ModelKind::Onnx,
                checksum,
                performance: None,
            }
        }
    };

    info!(
        version = loaded.predictor.model_version(),
        kind = loaded.kind.as_str(),
        features = loaded.schema.len(),
        checksum = %loaded.checksum,
        "Model loaded"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use std::fs;
    use tempfile::TempDir;

    const ARTIFACT: &str = r#"{
        "version": "v1.2.0",
        "feature_names": ["Social_Media_Spend", "Email_Spend"],
        "intercept": 5.0,
        "coefficients": [1.0, 2.0]
    }"#;

    fn write_model(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("model.json");
        fs::write(&path, ARTIFACT).unwrap();
        path
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"test model weights");
        assert_eq!(checksum.len(), 64); // SHA256 hex is 64 chars
        assert_eq!(checksum, compute_checksum(b"test model weights"));
    }

    #[test]
    fn test_load_linear_model() {
        let dir = TempDir::new().unwrap();
        let source = ModelSource {
            kind: ModelKind::Linear,
            model_path: write_model(&dir),
            schema_path: None,
            expected_sha256: Some(compute_checksum(ARTIFACT.as_bytes())),
        };
        let loaded = load_model(&source).unwrap();
        assert_eq!(loaded.schema.len(), 2);
        assert_eq!(loaded.predictor.model_version(), "v1.2.0");
        let y = loaded
            .predictor
            .predict(&FeatureVector::new(vec![1.0, 1.0]))
            .unwrap();
        assert_eq!(y, 8.0);
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let source = ModelSource {
            kind: ModelKind::Linear,
            model_path: write_model(&dir),
            schema_path: None,
            expected_sha256: Some("00".repeat(32)),
        };
        let err = load_model(&source).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_onnx_requires_schema() {
        let dir = TempDir::new().unwrap();
        let source = ModelSource {
            kind: ModelKind::Onnx,
            model_path: write_model(&dir),
            schema_path: None,
            expected_sha256: None,
        };
        assert!(load_model(&source).is_err());
    }

    #[test]
    fn test_missing_file() {
        let source = ModelSource {
            kind: ModelKind::Linear,
            model_path: PathBuf::from("/nonexistent/model.json"),
            schema_path: None,
            expected_sha256: None,
        };
        assert!(load_model(&source).is_err());
    }
}
