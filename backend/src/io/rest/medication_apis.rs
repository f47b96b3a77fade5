//! # REST API for Medication Management
//!
//! Endpoints for creating, retrieving, updating, deleting and refilling
//! medications.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use shared::{MedicationRequest, RefillRequest};
use tracing::info;

use super::error_response;
use crate::AppState;

/// Create a router for medication related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_medications).post(create_medication))
        .route("/refill-alerts", get(get_refill_alerts))
        .route(
            "/:id",
            get(get_medication).put(update_medication).delete(delete_medication),
        )
        .route("/:id/refill", post(refill_medication))
}

pub async fn list_medications(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/medications");

    let medications = state.medication_service.list_medications().await;
    (StatusCode::OK, Json(medications))
}

pub async fn create_medication(
    State(state): State<AppState>,
    Json(request): Json<MedicationRequest>,
) -> impl IntoResponse {
    info!("POST /api/medications - request: {:?}", request);

    match state.medication_service.create_medication(request).await {
        Ok(medication) => (StatusCode::CREATED, Json(medication)).into_response(),
        Err(e) => error_response("create medication", e),
    }
}

pub async fn get_medication(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/medications/{}", id);

    match state.medication_service.get_medication(&id).await {
        Some(medication) => (StatusCode::OK, Json(medication)).into_response(),
        None => (StatusCode::NOT_FOUND, "Medication not found").into_response(),
    }
}

pub async fn update_medication(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MedicationRequest>,
) -> impl IntoResponse {
    info!("PUT /api/medications/{} - request: {:?}", id, request);

    match state.medication_service.update_medication(&id, request).await {
        Ok(Some(medication)) => (StatusCode::OK, Json(medication)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Medication not found").into_response(),
        Err(e) => error_response("update medication", e),
    }
}

pub async fn delete_medication(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/medications/{}", id);

    match state.medication_service.delete_medication(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Medication not found").into_response(),
        Err(e) => error_response("delete medication", e),
    }
}

/// Restore full supply. The body is optional; the refill date defaults to today.
pub async fn refill_medication(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<RefillRequest>>,
) -> impl IntoResponse {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    info!("POST /api/medications/{}/refill - request: {:?}", id, request);

    match state
        .medication_service
        .refill_medication(&id, request.date)
        .await
    {
        Ok(Some(medication)) => (StatusCode::OK, Json(medication)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Medication not found").into_response(),
        Err(e) => error_response("refill medication", e),
    }
}

pub async fn get_refill_alerts(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/medications/refill-alerts");

    let alerts = state.medication_service.refill_alerts().await;
    (StatusCode::OK, Json(alerts))
}
