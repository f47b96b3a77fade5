//! # REST API for Dose History
//!
//! Endpoints for logging doses and reading the dose history.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use shared::RecordDoseRequest;
use tracing::info;

use super::error_response;
use crate::AppState;

/// Create a router for dose related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_doses).post(record_dose))
        .route("/today", get(list_todays_doses))
}

pub async fn list_doses(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/doses");

    let doses = state.medication_service.dose_history().await;
    (StatusCode::OK, Json(doses))
}

pub async fn list_todays_doses(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/doses/today");

    let doses = state.medication_service.todays_doses().await;
    (StatusCode::OK, Json(doses))
}

/// Log a taken or skipped dose. Taking a dose lowers the medication's supply.
pub async fn record_dose(
    State(state): State<AppState>,
    Json(request): Json<RecordDoseRequest>,
) -> impl IntoResponse {
    info!("POST /api/doses - request: {:?}", request);

    match state.medication_service.record_dose(request).await {
        Ok(dose) => (StatusCode::CREATED, Json(dose)).into_response(),
        Err(e) => error_response("record dose", e),
    }
}
