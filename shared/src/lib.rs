use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub mod date_format;

/// A persisted medication regimen.
///
/// Field names are camelCase on the wire so collections written by the
/// mobile app load without conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// Medication ID in format: "medication::<uuid>"
    pub id: String,
    pub name: String,
    /// Free text, e.g. "500mg" or "2 tablets"
    pub dosage: String,
    /// Clock times ("08:00") in display order
    pub times: Vec<String>,
    /// First day of treatment, time of day is never used for scheduling
    #[serde(with = "date_format")]
    pub start_date: NaiveDate,
    pub duration: MedicationDuration,
    /// Display tag, opaque to the backend
    pub color: String,
    #[serde(default)]
    pub reminder_enabled: bool,
    /// Doses remaining
    pub current_supply: u32,
    pub total_supply: u32,
    /// Supply level at or below which a refill is due
    pub refill_at: u32,
    #[serde(default)]
    pub refill_reminder: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "date_format::option"
    )]
    pub last_refill_date: Option<NaiveDate>,
}

/// One dose action, taken or skipped. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseHistory {
    /// Dose ID in format: "dose::<uuid>"
    pub id: String,
    /// Not checked against the medication collection; orphans are allowed
    pub medication_id: String,
    pub timestamp: DateTime<Utc>,
    pub taken: bool,
}

/// How long a medication stays on the schedule, counted from its start date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MedicationDuration {
    Ongoing,
    /// Number of scheduled days, the start date being day 1
    FixedDays(u32),
}

impl Medication {
    /// Generate a collision-resistant medication ID
    pub fn generate_id() -> String {
        format!("medication::{}", Uuid::new_v4())
    }

    /// True once supply has dropped to the refill threshold
    pub fn needs_refill(&self) -> bool {
        self.current_supply <= self.refill_at
    }

    /// Remaining supply as a percentage of the full supply
    pub fn supply_percentage(&self) -> f64 {
        if self.total_supply == 0 {
            return 0.0;
        }
        let percentage = self.current_supply as f64 / self.total_supply as f64 * 100.0;
        percentage.min(100.0)
    }
}

impl DoseHistory {
    /// Generate a collision-resistant dose ID
    pub fn generate_id() -> String {
        format!("dose::{}", Uuid::new_v4())
    }

    /// Calendar date of the dose in the device's local time zone
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.with_timezone(&Local).date_naive()
    }
}

impl MedicationDuration {
    pub const ONGOING_LABEL: &'static str = "Ongoing";

    /// Decode a duration string as stored by the mobile app.
    ///
    /// The first run of digits is the day count. A string that is neither
    /// "Ongoing" nor contains any digits decodes as `Ongoing`, which keeps
    /// records written with free-text durations on the schedule.
    pub fn from_stored(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(Self::ONGOING_LABEL) {
            return MedicationDuration::Ongoing;
        }

        let digits: String = raw
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();

        if digits.is_empty() {
            return MedicationDuration::Ongoing;
        }

        // Longer than u32 can hold: still a finite window, just a very long one
        let days = digits.parse::<u32>().unwrap_or(u32::MAX);
        MedicationDuration::FixedDays(days)
    }

    /// Day count, or None when ongoing
    pub fn days(&self) -> Option<u32> {
        match self {
            MedicationDuration::Ongoing => None,
            MedicationDuration::FixedDays(days) => Some(*days),
        }
    }

    pub fn is_ongoing(&self) -> bool {
        matches!(self, MedicationDuration::Ongoing)
    }
}

impl fmt::Display for MedicationDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MedicationDuration::Ongoing => write!(f, "{}", Self::ONGOING_LABEL),
            MedicationDuration::FixedDays(1) => write!(f, "1 day"),
            MedicationDuration::FixedDays(days) => write!(f, "{} days", days),
        }
    }
}

/// Strict parser used for user input: "Ongoing", "30", "1 day", "30 days"
impl FromStr for MedicationDuration {
    type Err = DurationParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DurationParseError::Empty);
        }
        if input.eq_ignore_ascii_case(Self::ONGOING_LABEL) {
            return Ok(MedicationDuration::Ongoing);
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let count = match parts.as_slice() {
            [count] => *count,
            [count, unit] if unit.eq_ignore_ascii_case("day") || unit.eq_ignore_ascii_case("days") => *count,
            _ => return Err(DurationParseError::InvalidFormat(input.to_string())),
        };

        let days = count
            .parse::<u32>()
            .map_err(|_| DurationParseError::InvalidFormat(input.to_string()))?;
        if days == 0 {
            return Err(DurationParseError::ZeroDays);
        }

        Ok(MedicationDuration::FixedDays(days))
    }
}

impl From<String> for MedicationDuration {
    fn from(raw: String) -> Self {
        MedicationDuration::from_stored(&raw)
    }
}

impl From<MedicationDuration> for String {
    fn from(duration: MedicationDuration) -> Self {
        duration.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DurationParseError {
    Empty,
    ZeroDays,
    InvalidFormat(String),
}

impl fmt::Display for DurationParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationParseError::Empty => write!(f, "Duration cannot be empty"),
            DurationParseError::ZeroDays => write!(f, "Duration must be at least one day"),
            DurationParseError::InvalidFormat(input) => {
                write!(f, "Invalid duration '{}': expected 'Ongoing' or a number of days", input)
            }
        }
    }
}

impl std::error::Error for DurationParseError {}

/// Body for creating a medication, or replacing one on update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRequest {
    pub name: String,
    pub dosage: String,
    pub times: Vec<String>,
    pub start_date: NaiveDate,
    /// Parsed strictly, see `MedicationDuration::from_str`
    pub duration: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub reminder_enabled: bool,
    pub current_supply: u32,
    pub total_supply: u32,
    pub refill_at: u32,
    #[serde(default)]
    pub refill_reminder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDoseRequest {
    pub medication_id: String,
    pub taken: bool,
    /// Uses current time if not provided
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefillRequest {
    /// Uses today's date if not provided
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearDateRangeRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearBeforeRequest {
    pub before: NaiveDate,
}

/// A medication that is due on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMedication {
    pub medication: Medication,
    pub times: Vec<String>,
    /// A taken dose exists for this medication on that day
    pub taken: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub date: NaiveDate,
    pub medications: Vec<ScheduledMedication>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub total_doses: u32,
    pub taken_doses: u32,
    /// 0.0 - 100.0, zero when nothing is scheduled
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillAlert {
    pub medication_id: String,
    pub name: String,
    pub current_supply: u32,
    pub total_supply: u32,
    pub refill_at: u32,
    pub supply_percentage: f64,
}

/// Whether a calendar cell is a real day or leading filler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CalendarDayType {
    /// Blank cell before the 1st so weeks line up on Sunday
    PaddingBefore,
    /// A day of the requested month
    MonthDay,
}

/// One month of the medication calendar, padded to start on a Sunday
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarMonth {
    pub month: u32,
    pub year: u32,
    pub days: Vec<CalendarDay>,
    /// Weekday of the 1st, counted from Sunday as 0
    pub first_day_of_week: u32,
}

/// A calendar cell; `day` is 0 for padding cells
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarDay {
    pub day: u32,
    pub entries: Vec<CalendarEntry>,
    pub day_type: CalendarDayType,
}

/// A scheduled medication shown in a calendar cell
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEntry {
    pub medication_id: String,
    pub name: String,
    pub color: String,
    pub times: Vec<String>,
    pub taken: bool,
}

/// Query for `GET /api/calendar/month`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarMonthRequest {
    pub month: u32,
    pub year: u32,
}
