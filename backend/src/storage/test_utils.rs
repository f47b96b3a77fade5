//! Test utilities shared by the storage, domain and io test modules.
//!
//! Provides record fixtures, a store with switchable failures, and an
//! SQLite-backed environment that cleans up its directory on drop.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use shared::{Medication, MedicationDuration};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use super::memory::MemoryStore;
use super::repository::RecordRepository;
use super::sqlite::DbConnection;
use super::traits::KeyValueStore;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Instant at local noon on the given day, so its local date is unambiguous
pub fn local_noon(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_hms_opt(12, 0, 0).expect("valid time");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("noon exists in local time")
        .with_timezone(&Utc)
}

/// A fully populated medication with the given id and start date
pub fn medication(id: &str, start_date: NaiveDate, duration: MedicationDuration) -> Medication {
    Medication {
        id: id.to_string(),
        name: format!("Medication {}", id),
        dosage: "10mg".to_string(),
        times: vec!["08:00".to_string(), "20:00".to_string()],
        start_date,
        duration,
        color: "#2196F3".to_string(),
        reminder_enabled: true,
        current_supply: 30,
        total_supply: 30,
        refill_at: 5,
        refill_reminder: false,
        last_refill_date: None,
    }
}

/// Memory-backed store whose reads and writes can be made to fail
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    /// Writes to this key fail, other keys are unaffected
    fail_writes_to: Arc<Mutex<Option<String>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes_to(&self, key: Option<&str>) {
        *self.fail_writes_to.lock().unwrap() = key.map(str::to_string);
    }

    fn write_fails(&self, key: &str) -> bool {
        self.fail_writes.load(Ordering::SeqCst)
            || self.fail_writes_to.lock().unwrap().as_deref() == Some(key)
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated read failure for {}", key));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.write_fails(key) {
            return Err(anyhow!("simulated write failure for {}", key));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.write_fails(key) {
            return Err(anyhow!("simulated write failure for {}", key));
        }
        self.inner.remove(key).await
    }
}

/// Memory-backed store that can stall a read after taking its snapshot,
/// widening the window between a read and the write that follows it
#[derive(Clone, Default)]
pub struct DelayedStore {
    inner: MemoryStore,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
}

impl DelayedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next read of `key` sleeps for `delay` before returning
    pub fn delay_next_read(&self, key: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(key.to_string(), delay);
    }
}

#[async_trait]
impl KeyValueStore for DelayedStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let snapshot = self.inner.get(key).await?;
        let delay = self.delays.lock().unwrap().remove(key);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}

/// RAII test environment backed by a real SQLite file
///
/// The temporary directory is removed when the environment is dropped,
/// even if the test panics.
pub struct TestEnvironment {
    /// Kept alive to prevent cleanup until drop
    _temp_dir: TempDir,
    pub connection: DbConnection,
    pub repository: RecordRepository<DbConnection>,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("medtrack_test_")?;
        let base_path = temp_dir.path().to_path_buf();
        let connection = DbConnection::new(base_path.join("medtrack.db")).await?;
        let repository = RecordRepository::new(connection.clone());

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            connection,
            repository,
            base_path,
        })
    }
}
