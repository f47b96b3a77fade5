//! # REST API for Data Management
//!
//! Bulk removal of stored medications and dose history.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, post},
    Router,
};
use shared::{ClearBeforeRequest, ClearDateRangeRequest};
use tracing::info;

use super::error_response;
use crate::AppState;

/// Create a router for data management APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", delete(clear_all_data))
        .route("/clear-range", post(clear_date_range))
        .route("/clear-before", post(clear_before))
}

pub async fn clear_all_data(State(state): State<AppState>) -> impl IntoResponse {
    info!("DELETE /api/data");

    match state.medication_service.clear_all_data().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("clear data", e),
    }
}

/// Remove medications starting, and doses recorded, within an inclusive range
pub async fn clear_date_range(
    State(state): State<AppState>,
    Json(request): Json<ClearDateRangeRequest>,
) -> impl IntoResponse {
    info!("POST /api/data/clear-range - request: {:?}", request);

    match state
        .medication_service
        .clear_data_for_date_range(request.start_date, request.end_date)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("clear date range", e),
    }
}

/// Remove medications starting, and doses recorded, before a date
pub async fn clear_before(
    State(state): State<AppState>,
    Json(request): Json<ClearBeforeRequest>,
) -> impl IntoResponse {
    info!("POST /api/data/clear-before - request: {:?}", request);

    match state.medication_service.clear_old_data(request.before).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("clear old data", e),
    }
}
