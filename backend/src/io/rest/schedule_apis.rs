//! # REST API for Daily Schedules
//!
//! Which medications are due on a day, and how much of that day is done.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::info;

use crate::AppState;

/// Query parameters for the schedule endpoints; the date defaults to today
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub date: Option<NaiveDate>,
}

impl ScheduleQuery {
    fn date_or_today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Create a router for schedule related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_daily_schedule))
        .route("/progress", get(get_daily_progress))
}

pub async fn get_daily_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> impl IntoResponse {
    info!("GET /api/schedule - query: {:?}", query);

    let schedule = state
        .medication_service
        .daily_schedule(query.date_or_today())
        .await;
    (StatusCode::OK, Json(schedule))
}

pub async fn get_daily_progress(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> impl IntoResponse {
    info!("GET /api/schedule/progress - query: {:?}", query);

    let progress = state
        .medication_service
        .daily_progress(query.date_or_today())
        .await;
    (StatusCode::OK, Json(progress))
}
