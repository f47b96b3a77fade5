//! # Record Repository
//!
//! Owns the two persisted collections of the medication tracker, each stored
//! as a single JSON array blob under a fixed key:
//!
//! ```text
//! "@medications"  -> [Medication, ...]
//! "@dose_history" -> [DoseHistory, ...]
//! ```
//!
//! Every mutation is a read-modify-write of the whole blob. Mutations are
//! serialized through one lock spanning both collections, so overlapping
//! calls (a double-tapped "take dose") cannot lose an update.
//!
//! ## Failure policy
//!
//! - Public reads never fail: a missing, unreadable or undecodable blob is
//!   logged and reported as an empty collection.
//! - Writes propagate store failures to the caller.
//! - Reads performed inside a mutation are strict, so a failed read aborts
//!   the mutation instead of overwriting stored data with a partial list.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{DoseHistory, Medication};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::traits::KeyValueStore;

pub const MEDICATIONS_KEY: &str = "@medications";
pub const DOSE_HISTORY_KEY: &str = "@dose_history";

/// Repository for medications and dose history over a key-value store
pub struct RecordRepository<S: KeyValueStore> {
    store: Arc<S>,
    /// Held for the full read-modify-write of any mutation
    write_lock: Arc<Mutex<()>>,
}

impl<S: KeyValueStore> Clone for RecordRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl<S: KeyValueStore> RecordRepository<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Build a repository over a store that is shared with other owners.
    /// Repositories built separately over the same store do not share a lock;
    /// clone one repository instead.
    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All medications, empty if none are stored or the read fails
    pub async fn list_medications(&self) -> Vec<Medication> {
        self.read_collection(MEDICATIONS_KEY).await
    }

    /// Find a medication by id, with the same failure policy as `list_medications`
    pub async fn get_medication(&self, medication_id: &str) -> Option<Medication> {
        self.list_medications()
            .await
            .into_iter()
            .find(|medication| medication.id == medication_id)
    }

    /// Append a medication to the collection
    pub async fn add_medication(&self, medication: &Medication) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut medications: Vec<Medication> = self.load_collection(MEDICATIONS_KEY).await?;
        medications.push(medication.clone());
        self.write_collection(MEDICATIONS_KEY, &medications).await?;

        info!("Added medication {} ({})", medication.id, medication.name);
        Ok(())
    }

    /// Replace the first medication with a matching id.
    ///
    /// Returns false without writing anything when no medication matches.
    pub async fn update_medication(&self, medication: &Medication) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        self.replace_medication(medication).await
    }

    /// Apply `change` to the stored medication with the given id and persist
    /// it, all under the repository lock.
    ///
    /// Returns None without writing when no medication matches. An error from
    /// `change` aborts the write.
    pub async fn modify_medication<F>(&self, medication_id: &str, change: F) -> Result<Option<Medication>>
    where
        F: FnOnce(&mut Medication) -> Result<()> + Send,
    {
        let _guard = self.write_lock.lock().await;

        let mut medications: Vec<Medication> = self.load_collection(MEDICATIONS_KEY).await?;
        let Some(medication) = medications.iter_mut().find(|m| m.id == medication_id) else {
            debug!("No medication {} to modify", medication_id);
            return Ok(None);
        };

        change(medication)?;
        let modified = medication.clone();

        self.write_collection(MEDICATIONS_KEY, &medications).await?;
        Ok(Some(modified))
    }

    /// Remove every medication with the given id. Its dose history is kept.
    pub async fn delete_medication(&self, medication_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let medications: Vec<Medication> = self.load_collection(MEDICATIONS_KEY).await?;
        let before = medications.len();
        let remaining: Vec<Medication> = medications
            .into_iter()
            .filter(|medication| medication.id != medication_id)
            .collect();
        let removed = before - remaining.len();

        self.write_collection(MEDICATIONS_KEY, &remaining).await?;

        info!("Deleted medication {} ({} entries removed)", medication_id, removed);
        Ok(removed > 0)
    }

    /// Full dose history, empty if none is stored or the read fails
    pub async fn list_dose_history(&self) -> Vec<DoseHistory> {
        self.read_collection(DOSE_HISTORY_KEY).await
    }

    /// Doses recorded on today's local calendar date
    pub async fn list_todays_doses(&self) -> Vec<DoseHistory> {
        self.list_doses_on(Local::now().date_naive()).await
    }

    /// Doses recorded on the given local calendar date, time of day ignored
    pub async fn list_doses_on(&self, date: NaiveDate) -> Vec<DoseHistory> {
        self.list_dose_history()
            .await
            .into_iter()
            .filter(|dose| dose.local_date() == date)
            .collect()
    }

    /// Log a dose action.
    ///
    /// When the dose was taken, the medication's supply is decremented by one
    /// unless it is already empty. Both steps run under the repository lock.
    /// If the supply write fails after the dose was appended, the dose entry
    /// stays recorded and the error is returned.
    pub async fn record_dose(
        &self,
        medication_id: &str,
        taken: bool,
        timestamp: DateTime<Utc>,
    ) -> Result<DoseHistory> {
        let _guard = self.write_lock.lock().await;

        let dose = DoseHistory {
            id: DoseHistory::generate_id(),
            medication_id: medication_id.to_string(),
            timestamp,
            taken,
        };

        let mut history: Vec<DoseHistory> = self.load_collection(DOSE_HISTORY_KEY).await?;
        history.push(dose.clone());
        self.write_collection(DOSE_HISTORY_KEY, &history).await?;

        info!(
            "Recorded dose {} for medication {} (taken: {})",
            dose.id, medication_id, taken
        );

        if taken {
            let medications: Vec<Medication> = self.load_collection(MEDICATIONS_KEY).await?;
            match medications.into_iter().find(|m| m.id == medication_id) {
                Some(mut medication) if medication.current_supply > 0 => {
                    medication.current_supply -= 1;
                    self.replace_medication(&medication).await?;
                    debug!(
                        "Supply for {} is now {}",
                        medication.id, medication.current_supply
                    );
                }
                Some(_) => debug!("Supply for {} already empty, not decremented", medication_id),
                None => warn!("Dose recorded for unknown medication {}", medication_id),
            }
        }

        Ok(dose)
    }

    /// Remove both collections entirely
    pub async fn clear_all_data(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        for key in [MEDICATIONS_KEY, DOSE_HISTORY_KEY] {
            self.store
                .remove(key)
                .await
                .with_context(|| format!("Failed to remove {}", key))?;
        }

        info!("Cleared all medication data");
        Ok(())
    }

    /// Drop medications starting, and doses recorded, within `[start, end]`.
    /// Both bounds are inclusive local calendar dates.
    pub async fn clear_data_for_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        let in_range = |date: NaiveDate| start <= date && date <= end;
        self.retain_records(|m| !in_range(m.start_date), |d| !in_range(d.local_date()))
            .await?;

        info!("Cleared data from {} to {}", start, end);
        Ok(())
    }

    /// Keep only medications starting, and doses recorded, on or after `before`
    pub async fn clear_old_data(&self, before: NaiveDate) -> Result<()> {
        self.retain_records(|m| m.start_date >= before, |d| d.local_date() >= before)
            .await?;

        info!("Cleared data before {}", before);
        Ok(())
    }

    /// Filter both collections and write back what remains
    async fn retain_records<M, D>(&self, keep_medication: M, keep_dose: D) -> Result<()>
    where
        M: Fn(&Medication) -> bool + Send,
        D: Fn(&DoseHistory) -> bool + Send,
    {
        let _guard = self.write_lock.lock().await;

        let medications: Vec<Medication> = self.load_collection(MEDICATIONS_KEY).await?;
        let doses: Vec<DoseHistory> = self.load_collection(DOSE_HISTORY_KEY).await?;
        let (medication_count, dose_count) = (medications.len(), doses.len());

        let medications: Vec<Medication> = medications.into_iter().filter(|m| keep_medication(m)).collect();
        let doses: Vec<DoseHistory> = doses.into_iter().filter(|d| keep_dose(d)).collect();

        self.write_collection(MEDICATIONS_KEY, &medications).await?;
        self.write_collection(DOSE_HISTORY_KEY, &doses).await?;

        debug!(
            "Removed {} medications and {} doses",
            medication_count - medications.len(),
            dose_count - doses.len()
        );
        Ok(())
    }

    /// Caller must hold the write lock
    async fn replace_medication(&self, medication: &Medication) -> Result<bool> {
        let mut medications: Vec<Medication> = self.load_collection(MEDICATIONS_KEY).await?;

        let Some(slot) = medications.iter_mut().find(|m| m.id == medication.id) else {
            debug!("No medication {} to update", medication.id);
            return Ok(false);
        };
        *slot = medication.clone();

        self.write_collection(MEDICATIONS_KEY, &medications).await?;
        Ok(true)
    }

    /// Lenient read for public queries
    async fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.load_collection(key).await {
            Ok(items) => items,
            Err(e) => {
                error!("{:#}; continuing with an empty collection", e);
                Vec::new()
            }
        }
    }

    /// Strict read used inside mutations. An absent key or a stored `null`
    /// is an empty collection.
    async fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let raw = self
            .store
            .get(key)
            .await
            .with_context(|| format!("Failed to read {}", key))?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        let items: Option<Vec<T>> =
            serde_json::from_str(&raw).with_context(|| format!("Failed to decode {}", key))?;
        Ok(items.unwrap_or_default())
    }

    async fn write_collection<T: Serialize + Sync>(&self, key: &str, items: &[T]) -> Result<()> {
        let json = serde_json::to_string(items).with_context(|| format!("Failed to encode {}", key))?;
        self.store
            .set(key, &json)
            .await
            .with_context(|| format!("Failed to write {}", key))
    }
}
