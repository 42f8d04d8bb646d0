//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::docs::ApiDoc;
use super::handlers::{health, metrics_handler, predict, ready, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    // Browser clients are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/predict", post(predict))
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::model::{ModelArtifact, ModelStore};
    use crate::service::PredictionService;

    const BODY: &str = r#"{"age":55,"gender":1,"chestpain":2,"restingBP":130,
        "serumcholestrol":250,"fastingbloodsugar":0,"restingrelectro":1,
        "maxheartrate":150,"exerciseangia":0,"oldpeak":1.5,"slope":2,
        "noofmajorvessels":0}"#;

    fn loaded_state() -> AppState {
        let artifact = ModelArtifact::from_slice(
            br#"{"estimator":"decision_tree","n_features":12,"classes":[0,1],
                 "tree":{"nodes":[{"value":[1,3]}]}}"#,
        )
        .unwrap();
        AppState::new(PredictionService::new(ModelStore::preloaded("mem", artifact)))
    }

    fn missing_state() -> AppState {
        AppState::new(PredictionService::new(ModelStore::reloading(
            "/nonexistent/model.json",
        )))
    }

    fn post_predict(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(missing_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_without_model() {
        let app = create_router(missing_state());

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_with_model() {
        let app = create_router(loaded_state());

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn predict_returns_label_and_probability() {
        let app = create_router(loaded_state());

        let response = app.oneshot(post_predict(BODY)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["prediction"], "1");
        assert_eq!(body["probability"], 0.75);
    }

    #[tokio::test]
    async fn predict_without_model_returns_500() {
        let app = create_router(missing_state());

        let response = app.oneshot(post_predict(BODY)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Model not available");
    }

    #[tokio::test]
    async fn malformed_json_returns_400() {
        let app = create_router(loaded_state());

        let response = app.oneshot(post_predict("{oops")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn non_json_content_type_returns_400() {
        let app = create_router(loaded_state());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(BODY))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("text/plain"), "{error}");
    }

    #[tokio::test]
    async fn json_content_type_with_charset_is_accepted() {
        let app = create_router(loaded_state());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(BODY))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_content_type_returns_400() {
        let app = create_router(loaded_state());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .body(Body::from(BODY))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = create_router(loaded_state());

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/predict")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn metrics_route_is_404_without_recorder() {
        let app = create_router(loaded_state());

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = create_router(missing_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert!(doc["paths"]["/predict"]["post"].is_object());
    }
}
