//! HTTP API for optimization, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use optimizer_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{OptimizerMetrics, StructuredLogger},
    optimizer::{compare_scenarios, AllocationOptimizer, OptimizationInsights, ScenarioComparison},
    predictor::{channel_effectiveness, LoadedModel, ModelPerformance},
    Allocation, Channel, OptimizationResult, OptimizerError, Scenario,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: OptimizerMetrics,
    pub logger: StructuredLogger,
    pub model: LoadedModel,
    pub optimize_timeout: Duration,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: OptimizerMetrics,
        logger: StructuredLogger,
        model: LoadedModel,
        optimize_timeout: Duration,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            logger,
            model,
            optimize_timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub current_allocation: HashMap<String, f64>,
    pub total_budget: f64,
    #[serde(default)]
    pub scenario: Option<String>,
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
    /// Defaults to the standard 25/35/15/25 split of the budget
    #[serde(default)]
    pub current_allocation: Option<HashMap<String, f64>>,
    /// Defaults to every known scenario
    #[serde(default)]
    pub scenarios: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub model_version: String,
    pub best_scenario: Option<Scenario>,
    pub comparison: ScenarioComparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub version: String,
    pub kind: String,
    pub checksum: String,
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<ModelPerformance>,
    pub channel_effectiveness: BTreeMap<Channel, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Failure of an optimization request
#[derive(Debug)]
pub enum ApiError {
    Optimizer(OptimizerError),
    Timeout(Duration),
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Optimizer(e) => e.kind(),
            ApiError::Timeout(_) => "timeout",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Optimizer(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            ApiError::Optimizer(OptimizerError::Cancelled { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Optimizer(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Optimizer(e) => write!(f, "{}", e),
            ApiError::Timeout(d) => write!(f, "optimization exceeded {}ms", d.as_millis()),
            ApiError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl From<OptimizerError> for ApiError {
    fn from(e: OptimizerError) -> Self {
        ApiError::Optimizer(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Count, log and (for predictor failures) surface a failed request in health
async fn record_failure(state: &AppState, err: ApiError) -> ApiError {
    state.metrics.inc_optimization_errors(err.kind());
    state.logger.log_optimization_failure(err.kind(), &err.to_string());
    if matches!(err, ApiError::Optimizer(OptimizerError::OptimizationFailed { .. })) {
        state
            .health_registry
            .set_degraded(components::MODEL, err.to_string())
            .await;
    }
    err
}

/// Run a CPU-bound optimization job off the async runtime, bounded by the
/// configured timeout, and record its outcome
///
/// On timeout the job is told to stop through the cancel flag; the search
/// checks it before each candidate, so the blocking thread is released
/// within one prediction.
async fn run_job<T, F>(state: &AppState, job: F) -> Result<T, ApiError>
where
    F: FnOnce(&LoadedModel, &AtomicBool) -> Result<T, OptimizerError> + Send + 'static,
    T: Send + 'static,
{
    let model = state.model.clone();
    let cancel = Arc::new(AtomicBool::new(false));
    let job_cancel = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || job(&model, &job_cancel));

    let outcome = match tokio::time::timeout(state.optimize_timeout, handle).await {
        Err(_) => {
            cancel.store(true, Ordering::Relaxed);
            Err(ApiError::Timeout(state.optimize_timeout))
        }
        Ok(Err(join_err)) => Err(ApiError::Internal(join_err.to_string())),
        Ok(Ok(result)) => result.map_err(ApiError::from),
    };

    match outcome {
        Ok(value) => {
            state.health_registry.set_healthy(components::MODEL).await;
            Ok(value)
        }
        Err(e) => Err(record_failure(state, e).await),
    }
}

fn parse_scenario(raw: Option<&str>) -> Result<Scenario, OptimizerError> {
    raw.map(str::parse).transpose().map(Option::unwrap_or_default)
}

fn parse_optimize(request: &OptimizeRequest) -> Result<(Allocation, Scenario), OptimizerError> {
    let current = Allocation::try_from_map(&request.current_allocation)?;
    let scenario = parse_scenario(request.scenario.as_deref())?;
    Ok((current, scenario))
}

fn parse_scenarios(request: &ScenarioRequest) -> Result<(Allocation, Vec<Scenario>), OptimizerError> {
    let current = match &request.current_allocation {
        Some(amounts) => Allocation::try_from_map(amounts)?,
        None => Allocation::default_split(request.total_budget),
    };
    let scenarios = match &request.scenarios {
        Some(names) => names
            .iter()
            .map(|n| n.parse())
            .collect::<Result<Vec<Scenario>, _>>()?,
        None => Scenario::ALL.to_vec(),
    };
    Ok((current, scenarios))
}

/// Optimize a submitted allocation
async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<OptimizationReport>, ApiError> {
    let start = Instant::now();
    let (current, scenario) = match parse_optimize(&request) {
        Ok(parsed) => parsed,
        Err(e) => return Err(record_failure(&state, e.into()).await),
    };
    let total_budget = request.total_budget;

    let result = run_job(&state, move |model, cancel| {
        AllocationOptimizer::new(model.predictor.as_ref())
            .with_cancel_flag(cancel)
            .optimize(&current, total_budget, &model.schema, scenario)
    })
    .await?;

    let model_version = state.model.predictor.model_version().to_string();
    state
        .metrics
        .record_optimization(&result, start.elapsed().as_secs_f64());
    state.logger.log_optimization(&result, &model_version);

    let insights = OptimizationInsights::from_result(&result);
    let summary = insights.summary_lines(&result);
    Ok(Json(OptimizationReport {
        model_version,
        result,
        insights,
        summary,
    }))
}

/// Compare optimized outcomes across scenarios
async fn scenarios(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScenarioRequest>,
) -> Result<Json<ScenarioReport>, ApiError> {
    let start = Instant::now();
    let total_budget = request.total_budget;
    let (current, scenario_list) = match parse_scenarios(&request) {
        Ok(parsed) => parsed,
        Err(e) => return Err(record_failure(&state, e.into()).await),
    };

    let comparison = run_job(&state, move |model, cancel| {
        let optimizer =
            AllocationOptimizer::new(model.predictor.as_ref()).with_cancel_flag(cancel);
        compare_scenarios(&optimizer, &current, total_budget, &model.schema, &scenario_list)
    })
    .await?;

    let elapsed = start.elapsed().as_secs_f64() / comparison.outcomes.len().max(1) as f64;
    for outcome in &comparison.outcomes {
        state.metrics.record_optimization(&outcome.result, elapsed);
    }

    Ok(Json(ScenarioReport {
        model_version: state.model.predictor.model_version().to_string(),
        best_scenario: comparison.best().map(|o| o.scenario),
        comparison,
    }))
}

/// Loaded model description
async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    let model = &state.model;
    let effectiveness = model
        .predictor
        .feature_importance()
        .map(|imp| channel_effectiveness(&model.schema, &imp))
        .unwrap_or_default();

    Json(ModelInfo {
        version: model.predictor.model_version().to_string(),
        kind: model.kind.as_str().to_string(),
        checksum: model.checksum.clone(),
        features: model.schema.names().to_vec(),
        performance: model.performance.clone(),
        channel_effectiveness: effectiveness,
    })
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/optimize", post(optimize))
        .route("/api/v1/scenarios", post(scenarios))
        .route("/api/v1/model", get(model_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
