//! Inclusive calendar-day ranges and range arithmetic

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, normalizing reversed bounds.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// The full calendar month containing `year`/`month` (1-based month).
    ///
    /// Returns `None` for out-of-range month numbers.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let (next_year, next_month) = shift_month(year, month, 1);
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
        Some(Self { start, end })
    }

    /// Number of days covered, counting both endpoints.
    pub fn days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Split into contiguous sub-ranges of at most `max_days` days each.
    ///
    /// The chunks tile the range exactly: the first starts at `start`, each
    /// subsequent chunk starts the day after its predecessor ends, and the
    /// last ends at `end`.
    pub fn chunked(&self, max_days: u32) -> Vec<Self> {
        let max_days = max_days.max(1) as u64;
        let mut chunks = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            let chunk_end = cursor
                .checked_add_days(Days::new(max_days - 1))
                .map_or(self.end, |candidate| candidate.min(self.end));
            chunks.push(Self { start: cursor, end: chunk_end });
            match chunk_end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }
        chunks
    }
}

/// Shift a 1-based `year`/`month` pair by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let zero_based = year as i64 * 12 + i64::from(month) - 1 + i64::from(delta);
    let shifted_year = zero_based.div_euclid(12) as i32;
    let shifted_month = zero_based.rem_euclid(12) as u32 + 1;
    (shifted_year, shifted_month)
}

/// First day of the month containing `day`, as a `(year, month)` pair.
pub fn year_month(day: NaiveDate) -> (i32, u32) {
    (day.year(), day.month())
}
