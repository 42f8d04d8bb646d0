//! HTTP API handlers.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::PredictError;
use crate::metrics;
use crate::service::PredictionService;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Prediction pipeline.
    pub service: PredictionService,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(service: PredictionService) -> Self {
        Self {
            service,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Successful prediction.
#[derive(Debug, Serialize, ToSchema)]
pub struct PredictionResponse {
    /// Predicted class label.
    #[schema(example = "1")]
    pub prediction: String,
    /// Probability of the high-risk class, in [0, 1].
    #[schema(example = 0.82)]
    pub probability: f64,
}

/// Error body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// What went wrong.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the model can currently be served.
    pub ready: bool,
    /// Artifact location.
    pub model_path: String,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Score one patient record.
#[utoipa::path(
    post,
    path = "/predict",
    tag = "prediction",
    request_body = crate::request::PredictionRequest,
    responses(
        (status = 200, description = "Risk classification", body = PredictionResponse),
        (status = 400, description = "Non-JSON content type, missing or non-numeric field, or inference failure", body = ErrorResponse),
        (status = 500, description = "Model not available", body = ErrorResponse)
    )
)]
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictionResponse>, PredictError> {
    let start = Instant::now();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap_or_default());
    let result = state.service.predict_json(content_type, &body).await;
    metrics::record_http_latency(start, "/predict");

    let prediction = result?;
    Ok(Json(PredictionResponse {
        prediction: prediction.label,
        probability: prediction.probability,
    }))
}

/// Health check handler - always returns 200.
#[utoipa::path(get, path = "/health", tag = "probes", responses((status = 200, body = HealthResponse)))]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if the model can be served, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "probes",
    responses(
        (status = 200, body = ReadyResponse),
        (status = 503, body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.service.store();
    let is_ready = store.get().await.is_ok();

    let response = ReadyResponse {
        ready: is_ready,
        model_path: store.path().display().to_string(),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus exposition - 404 when metrics are disabled.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
