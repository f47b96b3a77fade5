//! Medication service domain logic for the medication tracker.
//!
//! This module sits between the REST layer and the record repository. It
//! validates incoming requests, builds the per-day views the UI shows, and
//! tracks refills.
//!
//! ## Key Responsibilities
//!
//! - **Medication CRUD**: Validated create and update, delete and lookup
//! - **Dose Logging**: Recording taken or skipped doses with supply tracking
//! - **Daily Views**: Schedule and completion progress for a single day
//! - **Refills**: Restoring supply and reporting low supply alerts
//! - **Data Management**: Clearing everything, a date range, or old records

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate, NaiveTime, Utc};
use shared::{
    DailyProgress, DailySchedule, DoseHistory, Medication, MedicationDuration, MedicationRequest,
    RecordDoseRequest, RefillAlert, ScheduledMedication,
};
use std::collections::HashSet;
use tracing::{info, warn};

use super::schedule;
use crate::storage::{KeyValueStore, RecordRepository};

/// Color assigned when a request leaves it blank
pub const DEFAULT_COLOR: &str = "#2196F3";

#[derive(Debug, thiserror::Error)]
pub enum MedicationValidationError {
    #[error("Medication name cannot be empty")]
    EmptyName,
    #[error("Dosage cannot be empty")]
    EmptyDosage,
    #[error("At least one dose time is required")]
    NoTimes,
    #[error("Invalid dose time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("Invalid duration: {0}")]
    InvalidDuration(#[from] shared::DurationParseError),
    #[error("Current supply ({current}) cannot exceed total supply ({total})")]
    SupplyExceedsTotal { current: u32, total: u32 },
    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Service for managing medications and their dose history
#[derive(Clone)]
pub struct MedicationService<S: KeyValueStore> {
    repository: RecordRepository<S>,
}

impl<S: KeyValueStore> MedicationService<S> {
    pub fn new(repository: RecordRepository<S>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &RecordRepository<S> {
        &self.repository
    }

    /// Create a new medication from a validated request
    pub async fn create_medication(&self, request: MedicationRequest) -> Result<Medication> {
        info!("Creating medication: {:?}", request.name);

        let medication = build_medication(Medication::generate_id(), request, None)?;
        self.repository.add_medication(&medication).await?;

        info!("Created medication {}", medication.id);
        Ok(medication)
    }

    /// Replace an existing medication's fields. Returns None for an unknown id.
    ///
    /// The id and last refill date are kept from the stored record.
    pub async fn update_medication(
        &self,
        medication_id: &str,
        request: MedicationRequest,
    ) -> Result<Option<Medication>> {
        info!("Updating medication {}", medication_id);

        let replacement = build_medication(medication_id.to_string(), request, None)?;
        let updated = self
            .repository
            .modify_medication(medication_id, move |stored| {
                let last_refill_date = stored.last_refill_date;
                *stored = replacement;
                stored.last_refill_date = last_refill_date;
                Ok(())
            })
            .await?;

        if updated.is_none() {
            warn!("Update requested for unknown medication {}", medication_id);
        }
        Ok(updated)
    }

    /// Delete a medication. Its dose history is left in place.
    pub async fn delete_medication(&self, medication_id: &str) -> Result<bool> {
        info!("Deleting medication {}", medication_id);
        self.repository.delete_medication(medication_id).await
    }

    pub async fn list_medications(&self) -> Vec<Medication> {
        self.repository.list_medications().await
    }

    pub async fn get_medication(&self, medication_id: &str) -> Option<Medication> {
        self.repository.get_medication(medication_id).await
    }

    /// Record a dose action, stamped now unless the request carries a time
    pub async fn record_dose(&self, request: RecordDoseRequest) -> Result<DoseHistory> {
        let timestamp = request.timestamp.unwrap_or_else(Utc::now);
        self.repository
            .record_dose(&request.medication_id, request.taken, timestamp)
            .await
    }

    pub async fn dose_history(&self) -> Vec<DoseHistory> {
        self.repository.list_dose_history().await
    }

    pub async fn todays_doses(&self) -> Vec<DoseHistory> {
        self.repository.list_todays_doses().await
    }

    /// Medications due on `date`, each with its times and whether it was taken
    pub async fn daily_schedule(&self, date: NaiveDate) -> DailySchedule {
        let medications = self.repository.list_medications().await;
        let doses = self.repository.list_doses_on(date).await;
        let taken = taken_medication_ids(&doses);

        let medications = schedule::scheduled_on(&medications, date)
            .into_iter()
            .map(|medication| ScheduledMedication {
                times: schedule::scheduled_times_for(medication, date),
                taken: taken.contains(medication.id.as_str()),
                medication: medication.clone(),
            })
            .collect();

        DailySchedule { date, medications }
    }

    /// Scheduled dose count for `date` against the doses taken that day
    pub async fn daily_progress(&self, date: NaiveDate) -> DailyProgress {
        let medications = self.repository.list_medications().await;
        let doses = self.repository.list_doses_on(date).await;

        let scheduled = schedule::scheduled_on(&medications, date);
        let scheduled_ids: HashSet<&str> = scheduled.iter().map(|m| m.id.as_str()).collect();
        let total_doses: usize = scheduled.iter().map(|m| m.times.len()).sum();
        let taken_doses = doses
            .iter()
            .filter(|d| d.taken && scheduled_ids.contains(d.medication_id.as_str()))
            .count();

        let percentage = if total_doses == 0 {
            0.0
        } else {
            (taken_doses as f64 / total_doses as f64 * 100.0).min(100.0)
        };

        DailyProgress {
            date,
            total_doses: total_doses as u32,
            taken_doses: taken_doses as u32,
            percentage,
        }
    }

    /// Restore a medication to its full supply. Returns None for an unknown id.
    pub async fn refill_medication(
        &self,
        medication_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Option<Medication>> {
        let refill_date = date.unwrap_or_else(|| Local::now().date_naive());

        let refilled = self
            .repository
            .modify_medication(medication_id, |medication| {
                medication.current_supply = medication.total_supply;
                medication.last_refill_date = Some(refill_date);
                Ok(())
            })
            .await?;

        match &refilled {
            Some(medication) => info!(
                "Refilled medication {} to {}",
                medication.id, medication.current_supply
            ),
            None => warn!("Refill requested for unknown medication {}", medication_id),
        }
        Ok(refilled)
    }

    /// Medications at or below their refill threshold
    pub async fn refill_alerts(&self) -> Vec<RefillAlert> {
        self.repository
            .list_medications()
            .await
            .into_iter()
            .filter(Medication::needs_refill)
            .map(|medication| RefillAlert {
                supply_percentage: medication.supply_percentage(),
                medication_id: medication.id,
                name: medication.name,
                current_supply: medication.current_supply,
                total_supply: medication.total_supply,
                refill_at: medication.refill_at,
            })
            .collect()
    }

    pub async fn clear_all_data(&self) -> Result<()> {
        self.repository.clear_all_data().await
    }

    /// Clear records within `[start, end]`, rejecting an inverted range
    pub async fn clear_data_for_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        if start > end {
            bail!(MedicationValidationError::InvalidDateRange { start, end });
        }
        self.repository.clear_data_for_date_range(start, end).await
    }

    pub async fn clear_old_data(&self, before: NaiveDate) -> Result<()> {
        self.repository.clear_old_data(before).await
    }
}

/// Validate a request and turn it into a medication record
fn build_medication(
    id: String,
    request: MedicationRequest,
    last_refill_date: Option<NaiveDate>,
) -> Result<Medication, MedicationValidationError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(MedicationValidationError::EmptyName);
    }
    let dosage = request.dosage.trim();
    if dosage.is_empty() {
        return Err(MedicationValidationError::EmptyDosage);
    }

    if request.times.is_empty() {
        return Err(MedicationValidationError::NoTimes);
    }
    let times = request
        .times
        .iter()
        .map(|time| {
            let time = time.trim();
            NaiveTime::parse_from_str(time, "%H:%M")
                .map(|_| time.to_string())
                .map_err(|_| MedicationValidationError::InvalidTime(time.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let duration: MedicationDuration = request.duration.parse()?;

    if request.current_supply > request.total_supply {
        return Err(MedicationValidationError::SupplyExceedsTotal {
            current: request.current_supply,
            total: request.total_supply,
        });
    }

    let color = match request.color.trim() {
        "" => DEFAULT_COLOR.to_string(),
        color => color.to_string(),
    };

    Ok(Medication {
        id,
        name: name.to_string(),
        dosage: dosage.to_string(),
        times,
        start_date: request.start_date,
        duration,
        color,
        reminder_enabled: request.reminder_enabled,
        current_supply: request.current_supply,
        total_supply: request.total_supply,
        refill_at: request.refill_at,
        refill_reminder: request.refill_reminder,
        last_refill_date,
    })
}

fn taken_medication_ids(doses: &[DoseHistory]) -> HashSet<&str> {
    doses
        .iter()
        .filter(|d| d.taken)
        .map(|d| d.medication_id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::{date, local_noon, medication, DelayedStore, FlakyStore};
    use crate::storage::{MemoryStore, MEDICATIONS_KEY};
    use std::time::Duration;

    fn setup_service() -> MedicationService<MemoryStore> {
        MedicationService::new(RecordRepository::new(MemoryStore::new()))
    }

    fn request(name: &str) -> MedicationRequest {
        MedicationRequest {
            name: name.to_string(),
            dosage: "500mg".to_string(),
            times: vec!["08:00".to_string(), "20:00".to_string()],
            start_date: date(2024, 1, 1),
            duration: "30 days".to_string(),
            color: String::new(),
            reminder_enabled: true,
            current_supply: 20,
            total_supply: 60,
            refill_at: 10,
            refill_reminder: true,
        }
    }

    fn validation_error(err: anyhow::Error) -> MedicationValidationError {
        err.downcast::<MedicationValidationError>()
            .expect("expected a validation error")
    }

    #[tokio::test]
    async fn test_create_medication() {
        let service = setup_service();

        let created = service.create_medication(request("  Amoxicillin ")).await.unwrap();

        assert!(created.id.starts_with("medication::"));
        assert_eq!(created.name, "Amoxicillin");
        assert_eq!(created.duration, MedicationDuration::FixedDays(30));
        assert_eq!(created.color, DEFAULT_COLOR);
        assert_eq!(created.last_refill_date, None);
        assert_eq!(service.list_medications().await, vec![created]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_requests() {
        let service = setup_service();

        let mut empty_name = request("x");
        empty_name.name = "   ".to_string();
        let mut empty_dosage = request("x");
        empty_dosage.dosage = String::new();
        let mut no_times = request("x");
        no_times.times.clear();
        let mut bad_time = request("x");
        bad_time.times = vec!["8am".to_string()];
        let mut bad_duration = request("x");
        bad_duration.duration = "as needed".to_string();
        let mut zero_duration = request("x");
        zero_duration.duration = "0 days".to_string();
        let mut oversupplied = request("x");
        oversupplied.current_supply = 61;

        let cases = [
            (empty_name, "EmptyName"),
            (empty_dosage, "EmptyDosage"),
            (no_times, "NoTimes"),
            (bad_time, "InvalidTime"),
            (bad_duration, "InvalidDuration"),
            (zero_duration, "InvalidDuration"),
            (oversupplied, "SupplyExceedsTotal"),
        ];

        for (req, expected) in cases {
            let err = validation_error(service.create_medication(req).await.unwrap_err());
            assert!(
                format!("{:?}", err).starts_with(expected),
                "expected {}, got {:?}",
                expected,
                err
            );
        }

        assert!(service.list_medications().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_accepts_ongoing_duration() {
        let service = setup_service();
        let mut req = request("Vitamin D");
        req.duration = "ongoing".to_string();

        let created = service.create_medication(req).await.unwrap();
        assert_eq!(created.duration, MedicationDuration::Ongoing);
    }

    #[tokio::test]
    async fn test_update_medication_keeps_id_and_refill_date() {
        let service = setup_service();
        let created = service.create_medication(request("Amoxicillin")).await.unwrap();
        service
            .refill_medication(&created.id, Some(date(2024, 1, 15)))
            .await
            .unwrap();

        let mut changes = request("Amoxicillin XR");
        changes.times = vec!["09:30".to_string()];
        let updated = service
            .update_medication(&created.id, changes)
            .await
            .unwrap()
            .expect("medication exists");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Amoxicillin XR");
        assert_eq!(updated.times, vec!["09:30"]);
        assert_eq!(updated.last_refill_date, Some(date(2024, 1, 15)));
        assert_eq!(service.get_medication(&created.id).await, Some(updated));
    }

    #[tokio::test]
    async fn test_update_unknown_medication_returns_none() {
        let service = setup_service();

        let result = service.update_medication("medication::missing", request("x")).await.unwrap();
        assert!(result.is_none());
        assert!(service.list_medications().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_dose_defaults_timestamp_to_now() {
        let service = setup_service();
        let created = service.create_medication(request("Amoxicillin")).await.unwrap();

        let before = Utc::now();
        let dose = service
            .record_dose(RecordDoseRequest {
                medication_id: created.id.clone(),
                taken: true,
                timestamp: None,
            })
            .await
            .unwrap();

        assert!(dose.timestamp >= before);
        assert_eq!(service.todays_doses().await, vec![dose]);
        assert_eq!(service.get_medication(&created.id).await.unwrap().current_supply, 19);
    }

    #[tokio::test]
    async fn test_daily_schedule_and_progress() {
        let service = setup_service();
        let repository = service.repository();
        let day = date(2024, 2, 10);

        repository
            .add_medication(&medication("morning", date(2024, 2, 1), MedicationDuration::Ongoing))
            .await
            .unwrap();
        repository
            .add_medication(&medication("course", date(2024, 2, 1), MedicationDuration::FixedDays(5)))
            .await
            .unwrap();
        repository
            .add_medication(&medication("later", date(2024, 2, 5), MedicationDuration::Ongoing))
            .await
            .unwrap();

        repository.record_dose("morning", true, local_noon(day)).await.unwrap();
        repository.record_dose("later", false, local_noon(day)).await.unwrap();
        // Ended course and other days do not count
        repository.record_dose("course", true, local_noon(day)).await.unwrap();
        repository
            .record_dose("later", true, local_noon(date(2024, 2, 11)))
            .await
            .unwrap();

        let schedule = service.daily_schedule(day).await;
        let summary: Vec<(&str, bool)> = schedule
            .medications
            .iter()
            .map(|s| (s.medication.id.as_str(), s.taken))
            .collect();
        assert_eq!(summary, vec![("morning", true), ("later", false)]);
        assert_eq!(schedule.medications[0].times, vec!["08:00", "20:00"]);

        let progress = service.daily_progress(day).await;
        assert_eq!(progress.total_doses, 4);
        assert_eq!(progress.taken_doses, 1);
        assert!((progress.percentage - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_progress_with_nothing_scheduled() {
        let service = setup_service();

        let progress = service.daily_progress(date(2024, 1, 1)).await;
        assert_eq!(progress.total_doses, 0);
        assert_eq!(progress.percentage, 0.0);
    }

    #[tokio::test]
    async fn test_refill_and_alerts() {
        let service = setup_service();
        let mut low = medication("low", date(2024, 1, 1), MedicationDuration::Ongoing);
        low.current_supply = 5;
        let healthy = medication("healthy", date(2024, 1, 1), MedicationDuration::Ongoing);
        service.repository().add_medication(&low).await.unwrap();
        service.repository().add_medication(&healthy).await.unwrap();

        let alerts = service.refill_alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].medication_id, "low");
        assert!((alerts[0].supply_percentage - 100.0 / 6.0).abs() < 1e-9);

        let refilled = service
            .refill_medication("low", Some(date(2024, 3, 1)))
            .await
            .unwrap()
            .expect("medication exists");
        assert_eq!(refilled.current_supply, 30);
        assert_eq!(refilled.last_refill_date, Some(date(2024, 3, 1)));
        assert!(service.refill_alerts().await.is_empty());

        assert!(service.refill_medication("missing", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_range_rejects_inverted_range() {
        let service = setup_service();
        service.create_medication(request("Amoxicillin")).await.unwrap();

        let err = service
            .clear_data_for_date_range(date(2024, 2, 1), date(2024, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            validation_error(err),
            MedicationValidationError::InvalidDateRange { .. }
        ));
        assert_eq!(service.list_medications().await.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failures_surface_from_writes() {
        let store = FlakyStore::new();
        let service = MedicationService::new(RecordRepository::new(store.clone()));

        store.set_fail_writes(true);
        let err = service.create_medication(request("Amoxicillin")).await.unwrap_err();
        assert!(err.downcast_ref::<MedicationValidationError>().is_none());

        store.set_fail_reads(true);
        assert!(service.list_medications().await.is_empty());
        assert!(service.refill_alerts().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_refill_and_update_overlapping_keep_both_changes() {
        let store = DelayedStore::new();
        let service = MedicationService::new(RecordRepository::new(store.clone()));
        let created = service.create_medication(request("Amoxicillin")).await.unwrap();

        store.delay_next_read(MEDICATIONS_KEY, Duration::from_millis(200));
        let refill = {
            let service = service.clone();
            let id = created.id.clone();
            tokio::spawn(async move { service.refill_medication(&id, Some(date(2024, 2, 1))).await })
        };

        // Lands while the refill is between its read and its write
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut changes = request("Amoxicillin XR");
        changes.current_supply = 60;
        service
            .update_medication(&created.id, changes)
            .await
            .unwrap()
            .expect("medication exists");
        refill.await.unwrap().unwrap().expect("medication exists");

        let stored = service.get_medication(&created.id).await.unwrap();
        assert_eq!(stored.name, "Amoxicillin XR");
        assert_eq!(stored.last_refill_date, Some(date(2024, 2, 1)));
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_medication_unchanged() {
        let service = setup_service();
        let created = service.create_medication(request("Amoxicillin")).await.unwrap();

        let mut changes = request("Amoxicillin XR");
        changes.times = vec!["25:00".to_string()];
        let err = service.update_medication(&created.id, changes).await.unwrap_err();

        assert!(matches!(
            validation_error(err),
            MedicationValidationError::InvalidTime(_)
        ));
        assert_eq!(service.get_medication(&created.id).await, Some(created));
    }
}
