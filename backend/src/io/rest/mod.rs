//! # REST API Interface Layer
//!
//! HTTP endpoints for the medication tracker, all mounted under `/api`.
//!
//! | Route | Methods |
//! |-------|---------|
//! | `/medications` | GET, POST |
//! | `/medications/refill-alerts` | GET |
//! | `/medications/:id` | GET, PUT, DELETE |
//! | `/medications/:id/refill` | POST |
//! | `/doses`, `/doses/today` | GET, POST / GET |
//! | `/schedule`, `/schedule/progress` | GET |
//! | `/calendar/month` | GET |
//! | `/data`, `/data/clear-range`, `/data/clear-before` | DELETE / POST |

pub mod calendar_apis;
pub mod data_apis;
pub mod dose_apis;
pub mod medication_apis;
pub mod schedule_apis;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::domain::MedicationValidationError;

/// Map a domain error to a response: validation failures are the caller's
/// fault, everything else is a storage problem
pub(crate) fn error_response(action: &str, e: anyhow::Error) -> Response {
    if let Some(validation) = e.downcast_ref::<MedicationValidationError>() {
        return (StatusCode::BAD_REQUEST, validation.to_string()).into_response();
    }

    error!("Failed to {}: {:?}", action, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to {}", action),
    )
        .into_response()
}
