//! Monday-aligned week windows for the summary digest.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Number of days covered by a window, Monday through Friday.
pub const WINDOW_DAYS: i64 = 5;

/// The Monday–Friday span containing a reference date.
///
/// Covers `[start, start + 5 days)`, so Saturday and Sunday events never
/// land in a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekWindow {
    start: NaiveDate,
}

impl WeekWindow {
    /// Window for the week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = i64::from(date.weekday().num_days_from_monday());
        WeekWindow {
            start: date - Duration::days(offset),
        }
    }

    /// The Monday this window starts on.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive end: the Saturday after `start`.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(WINDOW_DAYS)
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        let start = self.start.and_time(NaiveTime::MIN);
        let end = self.end().and_time(NaiveTime::MIN);
        start <= t && t < end
    }

    pub fn previous(&self) -> Self {
        WeekWindow {
            start: self.start - Duration::weeks(1),
        }
    }

    pub fn next(&self) -> Self {
        WeekWindow {
            start: self.start + Duration::weeks(1),
        }
    }

    /// Deterministic page name, `{week_start}.html`.
    pub fn page_name(&self) -> String {
        format!("{}.html", self.start.format("%Y-%m-%d"))
    }
}

impl fmt::Display for WeekWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format("%Y-%m-%d"))
    }
}
