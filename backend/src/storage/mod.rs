//! # Storage Module
//!
//! Handles all data persistence for the medication tracker.
//!
//! The record repository only talks to a [`KeyValueStore`], so the backing
//! store can be swapped (SQLite file, in-memory map) without affecting the
//! domain or io layers.
//!
//! ## Key Responsibilities
//!
//! - **Key-Value Adapters**: SQLite table for production, memory map for tests
//! - **Record Repository**: CRUD and derived queries over the medication and
//!   dose-history collections
//! - **Consistency**: Serializing read-modify-write mutations so concurrent
//!   dose recording cannot lose supply updates

pub mod memory;
pub mod repository;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

// Re-export the main types that other modules need
pub use memory::MemoryStore;
pub use repository::{RecordRepository, DOSE_HISTORY_KEY, MEDICATIONS_KEY};
pub use sqlite::DbConnection;
pub use traits::KeyValueStore;
