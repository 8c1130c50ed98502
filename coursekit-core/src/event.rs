//! Calendar events as read from the portal feed.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use url::Url;

/// One scheduled session from the feed.
///
/// Only the three fields the tools need are kept; everything else in the
/// VEVENT is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Wall-clock start time with any time zone stripped.
    pub start_time: NaiveDateTime,
    pub title: String,
    pub detail_url: String,
}

impl CalendarEvent {
    pub fn new(
        start_time: NaiveDateTime,
        title: impl Into<String>,
        detail_url: impl Into<String>,
    ) -> Self {
        CalendarEvent {
            start_time,
            title: title.into(),
            detail_url: detail_url.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// Date formatted the way it appears in downloaded filenames.
    pub fn formatted_date(&self) -> String {
        self.start_time.format("%Y-%m-%d").to_string()
    }

    /// The `id` query parameter of the detail URL, if there is one.
    pub fn portal_id(&self) -> Option<String> {
        let url = Url::parse(&self.detail_url).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.start_time.format("%Y-%m-%d %H:%M"),
            self.title
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn portal_id_reads_id_query_parameter() {
        let event = CalendarEvent::new(
            at(2024, 1, 10, 9),
            "Anatomy",
            "https://portal.example.edu/central/events?id=4821&section=2",
        );
        assert_eq!(event.portal_id().as_deref(), Some("4821"));
    }

    #[test]
    fn portal_id_is_none_without_query() {
        let event = CalendarEvent::new(at(2024, 1, 10, 9), "Anatomy", "not a url");
        assert_eq!(event.portal_id(), None);
    }

    #[test]
    fn formatted_date_uses_iso_day() {
        let event = CalendarEvent::new(at(2024, 1, 10, 23), "Late", "https://x.test/");
        assert_eq!(event.formatted_date(), "2024-01-10");
    }
}
