//! Calendar domain logic for the medication tracker.
//!
//! Builds the data behind the calendar view: for each day of a month, the
//! medications that are scheduled and whether a dose was taken. The UI only
//! lays the cells out.

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use shared::{CalendarDay, CalendarDayType, CalendarEntry, CalendarMonth, DoseHistory, Medication};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::schedule;

/// Calendar service that handles all calendar-related business logic
#[derive(Clone, Default)]
pub struct CalendarService;

impl CalendarService {
    /// Create a new CalendarService instance
    pub fn new() -> Self {
        Self
    }

    /// Generate a calendar month with the medications due on each day
    pub fn generate_calendar_month(
        &self,
        month: u32,
        year: u32,
        medications: &[Medication],
        doses: &[DoseHistory],
    ) -> Result<CalendarMonth> {
        if !(1..=12).contains(&month) {
            bail!("Invalid month: {}. Must be between 1 and 12", month);
        }
        let Some(first_of_month) = i32::try_from(year)
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, month, 1))
        else {
            bail!("Invalid year: {}", year);
        };

        let days_in_month = self.days_in_month(month, year);
        let first_day = first_of_month.weekday().num_days_from_sunday();
        let taken_by_day = self.taken_medications_by_day(first_of_month, doses);

        let mut calendar_days = Vec::with_capacity((first_day + days_in_month) as usize);

        // Add empty cells for days before the first day of month
        for _ in 0..first_day {
            calendar_days.push(CalendarDay {
                day: 0,
                entries: Vec::new(),
                day_type: CalendarDayType::PaddingBefore,
            });
        }

        for day in 1..=days_in_month {
            let Some(date) = first_of_month.with_day(day) else {
                bail!("Invalid date {}-{:02}-{:02}", year, month, day);
            };
            let taken = taken_by_day.get(&day);

            let entries = schedule::scheduled_on(medications, date)
                .into_iter()
                .map(|medication| CalendarEntry {
                    medication_id: medication.id.clone(),
                    name: medication.name.clone(),
                    color: medication.color.clone(),
                    times: medication.times.clone(),
                    taken: taken.map_or(false, |ids| ids.contains(medication.id.as_str())),
                })
                .collect();

            calendar_days.push(CalendarDay {
                day,
                entries,
                day_type: CalendarDayType::MonthDay,
            });
        }

        debug!(
            "Generated calendar for {}/{} with {} cells",
            month,
            year,
            calendar_days.len()
        );

        Ok(CalendarMonth {
            month,
            year,
            days: calendar_days,
            first_day_of_week: first_day,
        })
    }

    /// Get the number of days in a given month and year
    pub fn days_in_month(&self, month: u32, year: u32) -> u32 {
        match month {
            2 => if self.is_leap_year(year) { 29 } else { 28 },
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// Check if a year is a leap year
    pub fn is_leap_year(&self, year: u32) -> bool {
        year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
    }

    /// Ids of medications with a taken dose, keyed by day of the month
    fn taken_medications_by_day<'a>(
        &self,
        first_of_month: NaiveDate,
        doses: &'a [DoseHistory],
    ) -> HashMap<u32, HashSet<&'a str>> {
        let mut taken_by_day: HashMap<u32, HashSet<&str>> = HashMap::new();

        for dose in doses.iter().filter(|dose| dose.taken) {
            let date = dose.local_date();
            if date.month() == first_of_month.month() && date.year() == first_of_month.year() {
                taken_by_day
                    .entry(date.day())
                    .or_default()
                    .insert(dose.medication_id.as_str());
            }
        }

        taken_by_day
    }
}
