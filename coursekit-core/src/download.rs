//! The downloader pass: every event page on or after a date, every file on
//! those pages.

use chrono::NaiveDateTime;

use crate::error::CourseKitResult;
use crate::event::CalendarEvent;
use crate::feed::Feed;
use crate::portal::Fetch;
use crate::resource::{DownloadOptions, ResourceOutcome, ResourceResolver};
use crate::scrape::{PageExtractor, PageSkip};

/// What happened to one event.
#[derive(Debug)]
pub enum EventOutcome {
    Scraped {
        event: CalendarEvent,
        resources: Vec<ResourceOutcome>,
    },
    Skipped {
        event: CalendarEvent,
        reason: PageSkip,
    },
    /// Fetching the page failed for a reason other than the session.
    Unreachable { event: CalendarEvent, error: String },
}

/// Totals for a downloader run.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub events: Vec<EventOutcome>,
    /// Resources whose fetch or write failed.
    pub failed: usize,
}

impl DownloadReport {
    fn resources(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.events.iter().flat_map(|e| match e {
            EventOutcome::Scraped { resources, .. } => resources.as_slice(),
            _ => &[][..],
        })
    }

    pub fn downloaded(&self) -> usize {
        self.resources()
            .filter(|r| {
                matches!(
                    r,
                    ResourceOutcome::Downloaded { .. } | ResourceOutcome::WouldDownload { .. }
                )
            })
            .count()
    }

    pub fn queued_videos(&self) -> usize {
        self.resources()
            .filter(|r| matches!(r, ResourceOutcome::QueuedVideo { .. }))
            .count()
    }

    pub fn skipped_resources(&self) -> usize {
        self.resources()
            .filter(|r| matches!(r, ResourceOutcome::Skipped { .. }))
            .count()
    }

    pub fn skipped_events(&self) -> usize {
        self.events
            .iter()
            .filter(|e| !matches!(e, EventOutcome::Scraped { .. }))
            .count()
    }
}

/// Visit each event starting at `from` (or every event) and resolve its
/// resources.
///
/// Losing the session or failing to write output aborts the run. Any other
/// failure only skips the event or resource it happened on.
pub fn download_resources<F, E>(
    feed: &Feed,
    from: Option<NaiveDateTime>,
    fetch: &F,
    extractor: &E,
    options: &DownloadOptions,
) -> CourseKitResult<DownloadReport>
where
    F: Fetch + ?Sized,
    E: PageExtractor + ?Sized,
{
    let resolver = ResourceResolver::new(fetch, options);
    let mut report = DownloadReport::default();

    for event in feed.events_since(from) {
        tracing::info!(date = %event.formatted_date(), title = %event.title, "Event");

        let html = match fetch.page(&event.detail_url) {
            Ok(html) => html,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                tracing::warn!(url = %event.detail_url, error = %e, "Could not fetch event page");
                report.events.push(EventOutcome::Unreachable {
                    event: event.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let page = match extractor.extract(&html, event) {
            Ok(page) => page,
            Err(reason) => {
                tracing::info!(title = %event.title, %reason, "Skipping event");
                report.events.push(EventOutcome::Skipped {
                    event: event.clone(),
                    reason,
                });
                continue;
            }
        };

        let mut resources = Vec::with_capacity(page.resource_links.len());
        for link in &page.resource_links {
            match resolver.resolve(&page, link) {
                Ok(outcome) => {
                    log_outcome(&outcome);
                    resources.push(outcome);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(href = %link.href, error = %e, "Resource failed");
                    report.failed += 1;
                }
            }
        }

        report.events.push(EventOutcome::Scraped {
            event: event.clone(),
            resources,
        });
    }

    Ok(report)
}

fn log_outcome(outcome: &ResourceOutcome) {
    match outcome {
        ResourceOutcome::Downloaded { path, bytes } => {
            tracing::info!(path = %path.display(), bytes, "Downloaded")
        }
        ResourceOutcome::WouldDownload { path } => {
            tracing::info!(path = %path.display(), "Would download")
        }
        ResourceOutcome::QueuedVideo { url } => tracing::info!(%url, "Queued for youtube-dl"),
        ResourceOutcome::Skipped { href, reason } => {
            tracing::info!(%href, %reason, "Skipping resource")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;

    use super::*;
    use crate::error::CourseKitError;
    use crate::portal::testing::FakePortal;
    use crate::scrape::MedtechExtractor;

    fn page_html(code: &str, title: &str, file_id: u32) -> String {
        format!(
            r#"<html><body>
            <a href="/central/courses?id=1">{code}: Course</a>
            <h1 id="page-top">{title}</h1>
            <a class="resource-link" href="/central/file?id={file_id}">Slides</a>
            <span class="label-info">Lecture Slides 2.3 MB</span>
            </body></html>"#
        )
    }

    fn event(day: u32, id: u32) -> CalendarEvent {
        CalendarEvent::new(
            NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            format!("Event {id}"),
            format!("https://portal.example.edu/events?id={id}"),
        )
    }

    fn options(dir: &Path) -> DownloadOptions {
        DownloadOptions {
            data_dir: dir.join("data"),
            file_url_template: "https://portal.example.edu/file?id={id}".into(),
            dry_run: false,
            youtube_dl_file: None,
        }
    }

    fn portal() -> FakePortal {
        FakePortal::new()
            .page(
                "https://portal.example.edu/events?id=1",
                &page_html("MEDS245", "Heart Sounds", 9001),
            )
            .page(
                "https://portal.example.edu/events?id=2",
                &page_html("MEDS246", "Lung Sounds", 9002),
            )
            .file(
                "https://portal.example.edu/file?id=9001",
                Some(r#"attachment; filename="slides.pdf""#),
                b"one",
            )
            .file(
                "https://portal.example.edu/file?id=9002",
                Some(r#"attachment; filename="lungs.pdf""#),
                b"two",
            )
    }

    #[test]
    fn test_downloads_events_on_or_after_date() {
        let dir = tempfile::tempdir().unwrap();
        let feed = Feed::from(vec![event(9, 1), event(10, 2)]);
        let from = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        let portal = portal();

        let report = download_resources(
            &feed,
            from,
            &portal,
            &MedtechExtractor::default(),
            &options(dir.path()),
        )
        .unwrap();

        assert_eq!(report.downloaded(), 1);
        assert!(
            dir.path()
                .join("data/MEDS246 - 2024-01-10 - Lung Sounds - Lecture Slides - lungs.pdf")
                .exists()
        );
        assert!(
            !portal
                .requests()
                .contains(&"https://portal.example.edu/events?id=1".to_string())
        );
    }

    #[test]
    fn test_second_run_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let feed = Feed::from(vec![event(9, 1), event(10, 2)]);
        let options = options(dir.path());
        let extractor = MedtechExtractor::default();

        let first = download_resources(&feed, None, &portal(), &extractor, &options).unwrap();
        let second = download_resources(&feed, None, &portal(), &extractor, &options).unwrap();

        assert_eq!(first.downloaded(), 2);
        assert_eq!(second.downloaded(), 0);
        assert_eq!(second.skipped_resources(), 2);
    }

    #[test]
    fn test_unreachable_page_skips_only_that_event() {
        let dir = tempfile::tempdir().unwrap();
        let feed = Feed::from(vec![event(9, 3), event(10, 2)]);
        let portal = portal().status("https://portal.example.edu/events?id=3", 500);

        let report = download_resources(
            &feed,
            None,
            &portal,
            &MedtechExtractor::default(),
            &options(dir.path()),
        )
        .unwrap();

        assert_eq!(report.skipped_events(), 1);
        assert_eq!(report.downloaded(), 1);
    }

    #[test]
    fn test_lost_session_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let feed = Feed::from(vec![event(9, 3), event(10, 2)]);
        let portal = portal().status("https://portal.example.edu/events?id=3", 403);

        let result = download_resources(
            &feed,
            None,
            &portal,
            &MedtechExtractor::default(),
            &options(dir.path()),
        );

        assert!(matches!(result, Err(CourseKitError::NotAuthenticated(_))));
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_login_form_served_as_event_page_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let feed = Feed::from(vec![event(10, 2)]);
        let portal = FakePortal::new().page(
            "https://portal.example.edu/events?id=2",
            r#"<form><input name="username"><input type="password" name="password"></form>"#,
        );

        let result = download_resources(
            &feed,
            None,
            &portal,
            &MedtechExtractor::default(),
            &options(dir.path()),
        );

        assert!(result.is_err_and(|e| e.is_auth()));
    }

    #[test]
    fn test_failed_resource_does_not_stop_event() {
        let dir = tempfile::tempdir().unwrap();
        let feed = Feed::from(vec![event(10, 2)]);
        let portal = FakePortal::new().page(
            "https://portal.example.edu/events?id=2",
            &page_html("MEDS246", "Lung Sounds", 404),
        );

        let report = download_resources(
            &feed,
            None,
            &portal,
            &MedtechExtractor::default(),
            &options(dir.path()),
        )
        .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped_events(), 0);
    }

    #[test]
    fn test_unwritable_data_dir_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        std::fs::write(&options.data_dir, "not a directory").unwrap();
        let feed = Feed::from(vec![event(9, 1), event(10, 2)]);
        let portal = portal();

        let result = download_resources(
            &feed,
            None,
            &portal,
            &MedtechExtractor::default(),
            &options,
        );

        assert!(matches!(result, Err(CourseKitError::Io(_))));
        assert!(
            !portal
                .requests()
                .contains(&"https://portal.example.edu/events?id=2".to_string())
        );
    }
}
