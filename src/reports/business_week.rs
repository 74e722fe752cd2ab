//! Saturday-to-Thursday business weeks
//!
//! Friday is the weekly holiday and belongs to no business week. A week runs from
//! Saturday 00:00:00 to the following Thursday 23:59:59.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::WeekNumbering;
use crate::types::{LedgerError, LedgerResult};

/// Number of trading days in a business week
pub const BUSINESS_DAYS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessWeek {
    /// Saturday 00:00:00
    pub start_date: NaiveDateTime,
    /// Thursday 23:59:59
    pub end_date: NaiveDateTime,
    pub week_number: u32,
    pub year: i32,
}

impl BusinessWeek {
    /// The Saturday that opens the week
    pub fn first_day(&self) -> NaiveDate {
        self.start_date.date()
    }

    /// The Thursday that closes the week
    pub fn last_day(&self) -> NaiveDate {
        self.end_date.date()
    }

    /// The six trading days, Saturday through Thursday
    pub fn days(&self) -> Vec<NaiveDate> {
        self.first_day()
            .iter_days()
            .take(BUSINESS_DAYS)
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }
}

/// Resolves dates to their enclosing business week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusinessWeekResolver {
    numbering: WeekNumbering,
}

impl BusinessWeekResolver {
    pub fn new(numbering: WeekNumbering) -> Self {
        Self { numbering }
    }

    /// Business week enclosing `date`.
    ///
    /// A Friday resolves to the week that ended the day before.
    pub fn resolve(&self, date: NaiveDate) -> LedgerResult<BusinessWeek> {
        let weekday = date.weekday().num_days_from_sunday();
        let days_back = match date.weekday() {
            Weekday::Fri => 6,
            Weekday::Sat => 0,
            _ => weekday + 1,
        };

        let saturday = shift_back(date, days_back.into())?;
        let thursday = saturday
            .checked_add_days(Days::new(5))
            .ok_or_else(|| out_of_range(date))?;

        let (week_number, year) = match self.numbering {
            WeekNumbering::DayOfYear => (saturday.ordinal0() / 7 + 1, saturday.year()),
            WeekNumbering::Iso8601 => {
                let iso = saturday.iso_week();
                (iso.week(), iso.year())
            }
        };

        Ok(BusinessWeek {
            start_date: at(saturday, 0, 0, 0)?,
            end_date: at(thursday, 23, 59, 59)?,
            week_number,
            year,
        })
    }

    /// Business week enclosing the calendar day of `moment`
    pub fn resolve_at(&self, moment: NaiveDateTime) -> LedgerResult<BusinessWeek> {
        self.resolve(moment.date())
    }

    /// The week `weeks_back` weeks before the one enclosing `date`
    pub fn resolve_offset(&self, date: NaiveDate, weeks_back: u32) -> LedgerResult<BusinessWeek> {
        let current = self.resolve(date)?;
        let saturday = shift_back(current.first_day(), u64::from(weeks_back) * 7)?;
        self.resolve(saturday)
    }

    /// The week immediately before `week`
    pub fn previous(&self, week: &BusinessWeek) -> LedgerResult<BusinessWeek> {
        self.resolve_offset(week.first_day(), 1)
    }
}

fn shift_back(date: NaiveDate, days: u64) -> LedgerResult<NaiveDate> {
    date.checked_sub_days(Days::new(days))
        .ok_or_else(|| out_of_range(date))
}

fn at(date: NaiveDate, hour: u32, minute: u32, second: u32) -> LedgerResult<NaiveDateTime> {
    date.and_hms_opt(hour, minute, second)
        .ok_or_else(|| out_of_range(date))
}

fn out_of_range(date: NaiveDate) -> LedgerError {
    LedgerError::Validation(format!("Date {} is outside the supported calendar", date))
}
