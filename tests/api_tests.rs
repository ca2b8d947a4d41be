#![cfg(feature = "server")]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use bmi_service::api::{BmiResponse, ClearResponse, ErrorBody};
use bmi_service::{router, AppState, BmiCategory, BmiRecord, Error, HistoryStore, NewRecord, SqliteStore};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

/// Store whose every operation fails like a dropped database connection
struct UnreachableStore;

#[async_trait]
impl HistoryStore for UnreachableStore {
    async fn append(&self, _record: NewRecord) -> bmi_service::Result<BmiRecord> {
        Err(Error::Storage("connection refused".to_string()))
    }

    async fn list_all(&self) -> bmi_service::Result<Vec<BmiRecord>> {
        Err(Error::Storage("connection refused".to_string()))
    }

    async fn clear_all(&self) -> bmi_service::Result<usize> {
        Err(Error::Storage("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

fn test_app() -> Router {
    let store = SqliteStore::open_in_memory().unwrap();
    router(AppState::new(Arc::new(store)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

async fn calculate(app: &Router, name: &str, weight: f64, height: f64) -> (StatusCode, Vec<u8>) {
    send(
        app,
        Method::POST,
        "/calculate-bmi",
        Some(json!({ "name": name, "weight": weight, "height": height })),
    )
    .await
}

async fn history(app: &Router) -> Vec<serde_json::Value> {
    let (status, body) = send(app, Method::GET, "/bmi/history", None).await;
    assert_eq!(status, StatusCode::OK);
    parse(&body)
}

#[tokio::test]
async fn test_calculate_bmi_normal_weight() {
    let app = test_app();

    let (status, body) = calculate(&app, "John Doe", 70.0, 1.75).await;
    assert_eq!(status, StatusCode::OK);

    let value: serde_json::Value = parse(&body);
    for key in ["name", "bmi", "category", "timestamp"] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }

    let response: BmiResponse = parse(&body);
    assert_eq!(response.name, "John Doe");
    assert_eq!(response.bmi, 22.86);
    assert_eq!(response.category, BmiCategory::NormalWeight);
    assert_eq!(value["category"], "Normal weight");
}

#[tokio::test]
async fn test_non_positive_inputs_rejected_and_not_stored() {
    let app = test_app();

    for (weight, height) in [(0.0, 1.75), (70.0, 0.0), (-5.0, 1.75)] {
        let (status, body) = calculate(&app, "Nobody", weight, height).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ErrorBody = parse(&body);
        assert_eq!(error.detail, "Weight and height must be positive numbers");
    }

    assert!(history(&app).await.is_empty());
}

#[tokio::test]
async fn test_overflowing_bmi_rejected_and_not_stored() {
    let app = test_app();

    let (status, body) = calculate(&app, "Tiny", 70.0, 1e-200).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorBody = parse(&body);
    assert_eq!(error.detail, "Weight and height must be positive numbers");

    assert!(history(&app).await.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let app = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/calculate-bmi",
        Some(json!({ "name": "Missing height", "weight": 70.0 })),
    )
    .await;

    assert!(status.is_client_error());
    let error: ErrorBody = parse(&body);
    assert!(error.detail.contains("height"), "detail was {:?}", error.detail);
    assert!(history(&app).await.is_empty());
}

#[tokio::test]
async fn test_non_json_body_gets_detail() {
    let app = test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/calculate-bmi")
        .header("content-type", "application/json")
        .body(Body::from("weight=70&height=1.75"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: ErrorBody = parse(&bytes);
    assert!(!error.detail.is_empty());
    assert!(history(&app).await.is_empty());
}

#[tokio::test]
async fn test_history_newest_first_with_all_fields() {
    let app = test_app();

    calculate(&app, "first", 50.0, 1.80).await;
    calculate(&app, "second", 85.0, 1.75).await;
    calculate(&app, "third", 120.0, 1.70).await;

    let records = history(&app).await;
    let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["third", "second", "first"]);

    let newest = &records[0];
    for key in ["id", "name", "height", "weight", "bmi", "category", "timestamp"] {
        assert!(newest.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(newest["category"], "Obese");
    assert_eq!(records[1]["category"], "Overweight");
    assert_eq!(records[2]["category"], "Underweight");
    assert_eq!(records[2]["weight"], 50.0);
    assert_eq!(records[2]["height"], 1.8);

    let typed: Vec<BmiRecord> = serde_json::from_value(json!(records)).unwrap();
    assert!(typed[0].id > typed[1].id);
    assert!(typed[0].timestamp >= typed[1].timestamp);
}

#[tokio::test]
async fn test_delete_history() {
    let app = test_app();
    calculate(&app, "a", 60.0, 1.70).await;
    calculate(&app, "b", 65.0, 1.70).await;

    let (status, body) = send(&app, Method::DELETE, "/bmi/history", None).await;
    assert_eq!(status, StatusCode::OK);

    let cleared: ClearResponse = parse(&body);
    assert_eq!(cleared.message, "All BMI history has been deleted successfully");
    assert_eq!(cleared.deleted, 2);

    assert!(history(&app).await.is_empty());
}

#[tokio::test]
async fn test_storage_failures_are_server_errors() {
    let app = router(AppState::new(Arc::new(UnreachableStore)));

    let (status, body) = calculate(&app, "John Doe", 70.0, 1.75).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorBody = parse(&body);
    assert_eq!(error.detail, "Internal server error");
    assert!(!String::from_utf8_lossy(&body).contains("connection refused"));

    let (status, _) = send(&app, Method::GET, "/bmi/history", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = send(&app, Method::DELETE, "/bmi/history", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_invalid_input_checked_before_storage() {
    // Even with a broken store, bad input is the caller's problem
    let app = router(AppState::new(Arc::new(UnreachableStore)));

    let (status, _) = calculate(&app, "Zero", 0.0, 1.75).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_index() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = parse(&body);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["backend"], "sqlite");

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("BMI Calculator"));
}
