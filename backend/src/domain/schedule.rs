//! Scheduling predicate for medications.
//!
//! A medication is due every day from its start date through the last day
//! of its duration. The start date counts as day 1, so a 30 day course that
//! starts on January 1st ends on January 30th. Every scheduled day carries
//! the medication's full list of times.

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use shared::{Medication, MedicationDuration};

/// Last scheduled day, or None when the medication has no end
pub fn end_date(medication: &Medication) -> Option<NaiveDate> {
    match medication.duration {
        MedicationDuration::Ongoing => None,
        // Zero days: the window closes before it opens
        MedicationDuration::FixedDays(0) => medication.start_date.pred_opt(),
        // Past the calendar's range the course is effectively unbounded
        MedicationDuration::FixedDays(days) => medication
            .start_date
            .checked_add_days(Days::new(u64::from(days - 1))),
    }
}

/// Whether a dose of the medication is due on the given calendar date
pub fn is_scheduled(medication: &Medication, date: NaiveDate) -> bool {
    if date < medication.start_date {
        return false;
    }
    match medication.duration {
        MedicationDuration::Ongoing => true,
        MedicationDuration::FixedDays(0) => false,
        MedicationDuration::FixedDays(_) => end_date(medication).map_or(true, |end| date <= end),
    }
}

/// Same as `is_scheduled`, with the instant reduced to its calendar date
/// in its own time zone
pub fn is_scheduled_at<Tz: TimeZone>(medication: &Medication, at: &DateTime<Tz>) -> bool {
    is_scheduled(medication, at.date_naive())
}

/// The times a dose is due on the given date, empty when not scheduled
pub fn scheduled_times_for(medication: &Medication, date: NaiveDate) -> Vec<String> {
    if is_scheduled(medication, date) {
        medication.times.clone()
    } else {
        Vec::new()
    }
}

/// Medications due on the given date, in collection order
pub fn scheduled_on(medications: &[Medication], date: NaiveDate) -> Vec<&Medication> {
    medications
        .iter()
        .filter(|medication| is_scheduled(medication, date))
        .collect()
}
