//! # Domain Module
//!
//! Contains all business logic for the medication tracker.
//!
//! This module encapsulates the rules for when a medication is due, how doses
//! affect supply, and how calendar and daily views are assembled. It operates
//! independently of any specific UI framework or storage mechanism.
//!
//! ## Module Organization
//!
//! - **schedule**: Pure scheduling predicate (is a medication due on a date)
//! - **medication_service**: Validated medication CRUD, dose logging, refills,
//!   daily schedule and progress
//! - **calendar**: Calendar month generation with scheduled medications per day
//!
//! ## Business Rules
//!
//! - A medication is due every day from its start date through the last day
//!   of its duration, the start date counting as day one
//! - A taken dose lowers the medication's supply by one, never below zero
//! - Deleting a medication leaves its dose history in place
//! - Names, dosages and dose times are validated before anything is stored

pub mod calendar;
pub mod medication_service;
pub mod schedule;

pub use calendar::CalendarService;
pub use medication_service::{MedicationService, MedicationValidationError};
