//! End-to-end tests for the `/predict` endpoint.
//!
//! Requests are driven through the full router with `tower::ServiceExt::oneshot`;
//! model artifacts come from the bundled sample or from temporary files.

use std::path::PathBuf;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use cardio_risk_service::api::{create_router, AppState};
use cardio_risk_service::model::{ModelArtifact, ModelMode, ModelStore};
use cardio_risk_service::request::FEATURE_NAMES;
use cardio_risk_service::service::PredictionService;

fn sample_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/random_forest_model.json")
}

fn example_payload() -> Value {
    json!({
        "age": 55, "gender": 1, "chestpain": 2, "restingBP": 130,
        "serumcholestrol": 250, "fastingbloodsugar": 0, "restingrelectro": 1,
        "maxheartrate": 150, "exerciseangia": 0, "oldpeak": 1.5, "slope": 2,
        "noofmajorvessels": 0
    })
}

fn router_for(path: impl Into<PathBuf>) -> Router {
    let store = ModelStore::reloading(path);
    create_router(AppState::new(PredictionService::new(store)))
}

async fn post(app: Router, payload: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn example_request_is_classified() {
    let (status, body) = post(router_for(sample_model_path()), &example_payload()).await;

    assert_eq!(status, StatusCode::OK);
    let label = body["prediction"].as_str().unwrap();
    assert!(label == "0" || label == "1", "unexpected label {label}");
    let probability = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
}

#[tokio::test]
async fn sample_forest_averages_its_trees() {
    let (_, body) = post(router_for(sample_model_path()), &example_payload()).await;

    // Leaves reached: [6, 60], [35, 15], [4, 50].
    let expected = (60.0 / 66.0 + 15.0 / 50.0 + 50.0 / 54.0) / 3.0;
    assert_eq!(body["prediction"], "1");
    assert!((body["probability"].as_f64().unwrap() - expected).abs() < 1e-12);
}

#[tokio::test]
async fn every_missing_field_is_reported_by_name() {
    for key in FEATURE_NAMES {
        let mut payload = example_payload();
        payload.as_object_mut().unwrap().remove(key);

        let (status, body) = post(router_for(sample_model_path()), &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], format!("Missing required field: {key}"));
    }
}

#[tokio::test]
async fn non_numeric_values_are_client_errors() {
    for key in FEATURE_NAMES {
        let mut payload = example_payload();
        payload
            .as_object_mut()
            .unwrap()
            .insert(key.to_string(), json!("not-a-number"));

        let (status, body) = post(router_for(sample_model_path()), &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains(key));
    }
}

#[tokio::test]
async fn numeric_strings_are_accepted() {
    let mut payload = example_payload();
    payload
        .as_object_mut()
        .unwrap()
        .insert("oldpeak".into(), json!("1.5"));

    let (status, _) = post(router_for(sample_model_path()), &payload).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn absent_model_yields_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = router_for(dir.path().join("random_forest_model.json"));

    let (status, body) = post(app, &example_payload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Model not available" }));
}

#[tokio::test]
async fn corrupt_model_yields_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(&path, b"\x80\x04\x95 pickled bytes").unwrap();

    let (status, body) = post(router_for(&path), &example_payload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Model not available");
}

#[tokio::test]
async fn identical_requests_get_identical_responses() {
    let app = router_for(sample_model_path());

    let first = post(app.clone(), &example_payload()).await;
    let second = post(app, &example_payload()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn mismatched_feature_count_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(
        &path,
        r#"{"estimator":"decision_tree","n_features":13,"classes":[0,1],
            "tree":{"nodes":[{"value":[1,1]}]}}"#,
    )
    .unwrap();

    let (status, body) = post(router_for(&path), &example_payload()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("13 features"));
}

#[tokio::test]
async fn reload_mode_picks_up_replaced_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let app = router_for(&path);

    let (status, _) = post(app.clone(), &example_payload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    std::fs::write(
        &path,
        r#"{"estimator":"decision_tree","n_features":12,"classes":[0,1],
            "tree":{"nodes":[{"value":[3,1]}]}}"#,
    )
    .unwrap();

    let (status, body) = post(app, &example_payload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "prediction": "0", "probability": 0.25 }));
}

#[tokio::test]
async fn preload_mode_serves_startup_artifact() {
    let store = ModelStore::open(sample_model_path(), ModelMode::Preload).await;
    let app = create_router(AppState::new(PredictionService::new(store)));

    let (status, _) = post(app, &example_payload()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bundled_artifact_is_valid() {
    let artifact = ModelArtifact::load(sample_model_path()).await.unwrap();
    let summary = artifact.summary();
    assert_eq!(summary.n_trees, 3);
    assert_eq!(summary.n_features, FEATURE_NAMES.len());
    assert_eq!(summary.classes, vec!["0".to_string(), "1".to_string()]);
}
