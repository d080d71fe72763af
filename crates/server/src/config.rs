//! Service configuration

use anyhow::{Context, Result};
use optimizer_lib::predictor::{ModelKind, ModelSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an optional config file
pub const CONFIG_PATH_ENV: &str = "ADOPTIMA_CONFIG";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// HTTP port for the API, health and metrics
    #[serde(default = "default_port")]
    pub port: u16,

    /// Trained model file
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default)]
    pub model_kind: ModelKind,

    /// Expected SHA-256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Feature schema file (JSON array), required for ONNX models
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Upper bound on one optimization or scenario comparison
    #[serde(default = "default_optimize_timeout_ms")]
    pub optimize_timeout_ms: u64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "adoptima".to_string())
}

fn default_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.json")
}

fn default_optimize_timeout_ms() -> u64 {
    5000
}

impl ServerConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load configuration with `file` layered under `ADOPTIMA_*` variables
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("ADOPTIMA"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn optimize_timeout(&self) -> Duration {
        Duration::from_millis(self.optimize_timeout_ms)
    }

    pub fn model_source(&self) -> ModelSource {
        ModelSource {
            kind: self.model_kind,
            model_path: self.model_path.clone(),
            schema_path: self.schema_path.clone(),
            expected_sha256: self.model_sha256.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_sources() {
        let config = ServerConfig::load_from(None).unwrap();
        assert_eq!(config.optimize_timeout_ms, 5000);
        assert_eq!(config.model_kind, ModelKind::Linear);
        assert!(config.model_sha256.is_none());
    }

    #[test]
    fn test_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("adoptima.toml");
        std::fs::write(
            &path,
            "port = 9191\nmodel_path = \"/models/revenue.onnx\"\nmodel_kind = \"onnx\"\nschema_path = \"/models/schema.json\"\noptimize_timeout_ms = 250\n",
        )
        .unwrap();

        let config = ServerConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.port, 9191);
        assert_eq!(config.model_kind, ModelKind::Onnx);
        assert_eq!(config.optimize_timeout(), Duration::from_millis(250));

        let source = config.model_source();
        assert_eq!(source.model_path, PathBuf::from("/models/revenue.onnx"));
        assert_eq!(source.schema_path, Some(PathBuf::from("/models/schema.json")));
    }
}
