//! # IO Module
//!
//! Interface layer between a presentation client and the domain logic.
//!
//! Translates HTTP requests into domain operations and domain results into
//! JSON responses. No business rules live here.
//!
//! ## Key Responsibilities
//!
//! - **API Endpoints**: REST endpoints for medications, doses, schedules,
//!   calendar and data management
//! - **Error Translation**: Validation failures become 400, unknown ids 404,
//!   storage failures 500
//! - **Request Logging**: Every handler logs the route it serves

pub mod rest;
