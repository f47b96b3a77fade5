//! # MedTrack Backend
//!
//! Contains all non-UI logic for the medication tracker.
//!
//! This crate serves as the orchestration layer that brings together:
//! - **Domain**: Scheduling rules, validation, refills and calendar views
//! - **Storage**: A key-value store holding the medication and dose-history
//!   collections
//! - **IO**: REST interface that exposes functionality to a UI
//!
//! ## Architecture
//!
//! ```text
//! UI Layer (any HTTP client)
//!     ↓
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (Business logic, services)
//!     ↓
//! Storage Layer (Record repository over a key-value store)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{CalendarService, MedicationService};
use crate::io::rest::{calendar_apis, data_apis, dose_apis, medication_apis, schedule_apis};
use crate::storage::{DbConnection, RecordRepository};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub medication_service: MedicationService<DbConnection>,
    pub calendar_service: CalendarService,
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database at {:?}", config.database_path());
    let db_conn = DbConnection::new(config.database_path()).await?;

    info!("Setting up domain model");
    let repository = RecordRepository::new(db_conn);
    let medication_service = MedicationService::new(repository);
    let calendar_service = CalendarService::new();

    Ok(AppState {
        medication_service,
        calendar_service,
    })
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: &str) -> Router {
    // CORS setup to allow a frontend on another origin to make requests
    let origin = match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!("Invalid allowed origin {:?}, allowing any origin", allowed_origin);
            AllowOrigin::any()
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/medications", medication_apis::router())
        .nest("/doses", dose_apis::router())
        .nest("/schedule", schedule_apis::router())
        .nest("/calendar", calendar_apis::router())
        .nest("/data", data_apis::router());

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}
