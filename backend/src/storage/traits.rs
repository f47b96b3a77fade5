//! # Storage Traits
//!
//! This module defines the storage abstraction the record repository is
//! built on, so different key-value backends can be used interchangeably.

use anyhow::Result;
use async_trait::async_trait;

/// Trait defining the interface for key-value storage operations
///
/// Values are opaque string blobs. Every call may fail; the repository
/// decides whether a failure degrades (reads) or propagates (writes).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve the value stored under a key, None if absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, overwriting any existing value for the same key
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
