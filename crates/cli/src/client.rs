//! API client for communicating with the optimizer server

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use url::Url;

/// API client for the optimizer server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("API error ({}): {}: {}", status, err.error, err.message),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizationReport> {
        self.post("api/v1/optimize", request).await
    }

    pub async fn compare_scenarios(&self, request: &ScenarioRequest) -> Result<ScenarioReport> {
        self.post("api/v1/scenarios", request).await
    }

    pub async fn model_info(&self) -> Result<ModelInfo> {
        self.get("api/v1/model").await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("healthz").await
    }
}

// API request and response types

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Allocation {
    pub social_media: f64,
    pub search_ads: f64,
    pub email: f64,
    pub promotions: f64,
}

impl Allocation {
    pub fn total(&self) -> f64 {
        self.social_media + self.search_ads + self.email + self.promotions
    }

    /// Channel labels paired with amounts, in display order
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("Social Media", self.social_media),
            ("Search Ads", self.search_ads),
            ("Email", self.email),
            ("Promotions", self.promotions),
        ]
    }

    pub fn to_request_map(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("social_media".to_string(), self.social_media),
            ("search_ads".to_string(), self.search_ads),
            ("email".to_string(), self.email),
            ("promotions".to_string(), self.promotions),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub current_allocation: HashMap<String, f64>,
    pub total_budget: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub scenario: String,
    pub total_budget: f64,
    pub current_allocation: Allocation,
    pub optimized_allocation: Allocation,
    pub current_revenue: f64,
    pub optimized_revenue: f64,
    pub revenue_improvement: f64,
    pub current_roi: f64,
    pub optimized_roi: f64,
    pub roi_improvement: f64,
    pub candidates_evaluated: usize,
    pub candidates_rejected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecommendation {
    pub channel: String,
    pub direction: String,
    pub current_amount: f64,
    pub optimized_amount: f64,
    pub change_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationInsights {
    #[serde(default)]
    pub revenue_change_pct: Option<f64>,
    #[serde(default)]
    pub roi_change_pct: Option<f64>,
    pub already_optimal: bool,
    pub recommendations: Vec<ChannelRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub model_version: String,
    pub result: OptimizationResult,
    pub insights: OptimizationInsights,
    pub summary: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub total_budget: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_allocation: Option<HashMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub optimized_revenue: f64,
    pub optimized_roi: f64,
    pub result: OptimizationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub total_budget: f64,
    pub outcomes: Vec<ScenarioOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub model_version: String,
    #[serde(default)]
    pub best_scenario: Option<String>,
    pub comparison: ScenarioComparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub version: String,
    pub kind: String,
    pub checksum: String,
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<ModelPerformance>,
    #[serde(default)]
    pub channel_effectiveness: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
