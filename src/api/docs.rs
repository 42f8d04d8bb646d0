//! OpenAPI document for the service.

use utoipa::OpenApi;

use super::handlers::{
    self, ErrorResponse, HealthResponse, PredictionResponse, ReadyResponse,
};
use crate::request::PredictionRequest;

/// Generated OpenAPI description.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cardio Risk Service",
        description = "Cardiovascular disease risk classification from twelve clinical measurements"
    ),
    paths(handlers::predict, handlers::health, handlers::ready),
    components(schemas(
        PredictionRequest,
        PredictionResponse,
        ErrorResponse,
        HealthResponse,
        ReadyResponse
    )),
    tags(
        (name = "prediction", description = "Risk scoring"),
        (name = "probes", description = "Liveness and readiness")
    )
)]
pub struct ApiDoc;
