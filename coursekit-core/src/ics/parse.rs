//! Feed parsing using the icalendar crate's parser.

use chrono::{NaiveDateTime, NaiveTime};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};

use crate::error::{CourseKitError, CourseKitResult};
use crate::event::CalendarEvent;

/// Parse a whole calendar feed into events, in feed order.
///
/// Any VEVENT without a usable DTSTART or URL fails the whole parse: the
/// filters downstream need the complete event set.
pub fn parse_events(content: &str) -> CourseKitResult<Vec<CalendarEvent>> {
    if !content.trim_start().starts_with("BEGIN:VCALENDAR") {
        return Err(CourseKitError::IcsParse(
            "feed does not start with BEGIN:VCALENDAR".into(),
        ));
    }

    let unfolded = unfold(content);
    let calendar =
        read_calendar(&unfolded).map_err(|e| CourseKitError::IcsParse(e.to_string()))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    vevents.into_iter().map(to_calendar_event).collect()
}

/// VEVENTs may sit at the top level or inside a VCALENDAR component depending
/// on how the parser folded the outer block.
fn collect_vevents<'a>(components: &'a [Component<'a>], out: &mut Vec<&'a Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn to_calendar_event(vevent: &Component<'_>) -> CourseKitResult<CalendarEvent> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .unwrap_or_else(|| "(no UID)".to_string());

    let dtstart = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| CourseKitError::IcsParse(format!("event {uid} has no DTSTART")))?;
    let start = DatePerhapsTime::try_from(dtstart).map_err(|_| {
        CourseKitError::IcsParse(format!(
            "event {uid} has an unreadable DTSTART '{}'",
            dtstart.val
        ))
    })?;

    let detail_url = vevent
        .find_prop("URL")
        .map(|p| p.val.to_string())
        .ok_or_else(|| CourseKitError::IcsParse(format!("event {uid} has no URL")))?;

    let title = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_else(|| "(No title)".to_string());

    Ok(CalendarEvent::new(naive_start(start), title, detail_url))
}

/// Drop time zone information, keeping the wall-clock time as written.
fn naive_start(dpt: DatePerhapsTime) -> NaiveDateTime {
    match dpt {
        DatePerhapsTime::Date(d) => d.and_time(NaiveTime::MIN),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => dt.naive_utc(),
            CalendarDateTime::Floating(naive) => naive,
            CalendarDateTime::WithTimezone { date_time, .. } => date_time,
        },
    }
}

/// Undo RFC 5545 TEXT escaping (`\,` `\;` `\n` `\\`).
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Portal//Calendar//EN\r\n\
BEGIN:VEVENT\r\n\
UID:evt-1\r\n\
SUMMARY:Cardiology: Heart Sounds\r\n\
DTSTART;TZID=America/Toronto:20240110T083000\r\n\
DTEND;TZID=America/Toronto:20240110T093000\r\n\
URL:https://portal.example.edu/central/events?id=101\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:evt-2\r\n\
SUMMARY:Ethics\\, Law and Practice\r\n\
DTSTART:20240111T140000Z\r\n\
URL:https://portal.example.edu/central/events?id=102\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:evt-3\r\n\
DTSTART;VALUE=DATE:20240112\r\n\
URL:https://portal.example.edu/central/events?id=103\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parse_events_keeps_feed_order_and_wall_clock() {
        let events = parse_events(FEED).expect("Should parse");

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].title, "Cardiology: Heart Sounds");
        assert_eq!(
            events[0].start_time,
            NaiveDate::from_ymd_opt(2024, 1, 10)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap()
        );
        assert_eq!(
            events[0].detail_url,
            "https://portal.example.edu/central/events?id=101"
        );
        assert_eq!(events[1].start_time.format("%H:%M").to_string(), "14:00");
        assert_eq!(events[1].title, "Ethics, Law and Practice");
    }

    #[test]
    fn test_all_day_event_starts_at_midnight_with_default_title() {
        let events = parse_events(FEED).expect("Should parse");

        assert_eq!(events[2].title, "(No title)");
        assert_eq!(events[2].start_time.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn test_folded_lines_are_unfolded() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:evt-1\r\n\
SUMMARY:A very long \r\n title\r\n\
DTSTART:20240110T083000\r\n\
URL:https://portal.example.edu/central/\r\n events?id=7\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_events(ics).expect("Should parse");
        assert_eq!(events[0].title, "A very long title");
        assert_eq!(
            events[0].detail_url,
            "https://portal.example.edu/central/events?id=7"
        );
    }

    #[test]
    fn test_missing_url_is_a_parse_error() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:no-url\r\n\
DTSTART:20240110T083000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let err = parse_events(ics).unwrap_err();
        assert!(matches!(err, CourseKitError::IcsParse(ref msg) if msg.contains("no-url")));
    }

    #[test]
    fn test_html_instead_of_feed_is_rejected() {
        let err = parse_events("<html><body>Please log in</body></html>").unwrap_err();
        assert!(matches!(err, CourseKitError::IcsParse(_)));
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text(r"a\;b\\c\nd"), "a;b\\c\nd");
    }
}
