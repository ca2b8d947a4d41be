// BMI Service - HTTP API
// Axum router over a HistoryStore; binaries only bind and serve it

use crate::calculator::{self, BmiCategory};
use crate::db::{BmiRecord, NewRecord};
use crate::error::Error;
use crate::history::HistoryStore;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const INVALID_INPUT_DETAIL: &str = "Weight and height must be positive numbers";
pub const STORAGE_ERROR_DETAIL: &str = "Internal server error";
pub const HISTORY_CLEARED_MESSAGE: &str = "All BMI history has been deleted successfully";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn HistoryStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct BmiRequest {
    pub name: String,
    /// kg
    pub weight: f64,
    /// m
    pub height: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BmiResponse {
    pub name: String,
    pub bmi: f64,
    pub category: BmiCategory,
    pub timestamp: DateTime<Utc>,
}

impl From<BmiRecord> for BmiResponse {
    fn from(record: BmiRecord) -> Self {
        Self {
            name: record.name,
            bmi: record.bmi,
            category: record.category,
            timestamp: record.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub message: String,
    pub deleted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Error as seen by HTTP clients; storage causes are logged, never echoed
#[derive(Debug)]
pub enum ApiError {
    Service(Error),
    /// Body missing, not JSON, or not shaped like the request type
    Body(JsonRejection),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Service(Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, INVALID_INPUT_DETAIL.to_string())
            }
            ApiError::Service(Error::Storage(_) | Error::Config(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                STORAGE_ERROR_DETAIL.to_string(),
            ),
            ApiError::Body(rejection) => (rejection.status(), rejection.body_text()),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /calculate-bmi
async fn calculate_bmi(
    State(state): State<AppState>,
    payload: Result<Json<BmiRequest>, JsonRejection>,
) -> Result<Json<BmiResponse>, ApiError> {
    let Json(input) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected BMI request body");
        rejection
    })?;
    info!(name = %input.name, "Calculating BMI");

    let result = calculator::calculate(input.weight, input.height).map_err(|e| {
        warn!(weight = input.weight, height = input.height, "Rejected BMI input");
        e
    })?;

    info!(name = %input.name, bmi = result.bmi, category = %result.category, "BMI calculated");

    let record = NewRecord {
        name: input.name,
        height: input.height,
        weight: input.weight,
        bmi: result.bmi,
        category: result.category,
    };

    let stored = state.store.append(record).await.map_err(|e| {
        error!(error = %e, "Failed to save BMI record");
        e
    })?;

    info!(id = stored.id, name = %stored.name, "BMI record saved");
    Ok(Json(stored.into()))
}

/// GET /bmi/history
async fn get_history(State(state): State<AppState>) -> Result<Json<Vec<BmiRecord>>, ApiError> {
    info!("Retrieving BMI history");

    let records = state.store.list_all().await.map_err(|e| {
        error!(error = %e, "Failed to retrieve BMI history");
        e
    })?;

    info!(count = records.len(), "Retrieved BMI records");
    Ok(Json(records))
}

/// DELETE /bmi/history
async fn delete_history(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    info!("Deleting all BMI history");

    let deleted = state.store.clear_all().await.map_err(|e| {
        error!(error = %e, "Failed to delete BMI history");
        e
    })?;

    info!(deleted, "Deleted all BMI history");
    Ok(Json(ClearResponse {
        message: HISTORY_CLEARED_MESSAGE.to_string(),
        deleted,
    }))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "backend": state.store.backend_name(),
    }))
}

/// GET / - the calculator form
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/health", get(health_check))
        .route("/calculate-bmi", post(calculate_bmi))
        .route("/bmi/history", get(get_history).delete(delete_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
