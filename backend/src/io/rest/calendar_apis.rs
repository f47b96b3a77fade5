//! # REST API for the Calendar View

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use shared::CalendarMonthRequest;
use tracing::{info, warn};

use crate::AppState;

/// Create a router for calendar related APIs
pub fn router() -> Router<AppState> {
    Router::new().route("/month", get(get_calendar_month))
}

/// Get calendar month data with the medications due on each day
pub async fn get_calendar_month(
    State(state): State<AppState>,
    Query(query): Query<CalendarMonthRequest>,
) -> impl IntoResponse {
    info!("GET /api/calendar/month - query: {:?}", query);

    let medications = state.medication_service.list_medications().await;
    let doses = state.medication_service.dose_history().await;

    match state
        .calendar_service
        .generate_calendar_month(query.month, query.year, &medications, &doses)
    {
        Ok(calendar) => (StatusCode::OK, Json(calendar)).into_response(),
        Err(e) => {
            warn!("Rejected calendar request: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}
