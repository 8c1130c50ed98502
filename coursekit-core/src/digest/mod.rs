//! Weekly summary pages.
//!
//! A [`WeeklyDigest`] is the pure grouping of feed events into the days of a
//! [`WeekWindow`]. [`build_page`] then visits each event page through the
//! portal session and produces a [`DigestPage`] ready to render.

mod render;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use url::Url;

use crate::error::CourseKitResult;
use crate::event::CalendarEvent;
use crate::feed::Feed;
use crate::portal::Fetch;
use crate::scrape::{PageExtractor, ScrapedEventPage, Stylesheet};
use crate::week::WeekWindow;

/// Feed events within one week window, bucketed by calendar day.
///
/// Days are in chronological order; events within a day keep feed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyDigest {
    window: WeekWindow,
    days: BTreeMap<NaiveDate, Vec<CalendarEvent>>,
}

impl WeeklyDigest {
    pub fn for_window(window: WeekWindow, feed: &Feed) -> Self {
        let mut days: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();
        for event in feed.events().filter(|e| window.contains(e.start_time)) {
            days.entry(event.date()).or_default().push(event.clone());
        }
        WeeklyDigest { window, days }
    }

    pub fn window(&self) -> WeekWindow {
        self.window
    }

    pub fn days(&self) -> &BTreeMap<NaiveDate, Vec<CalendarEvent>> {
        &self.days
    }

    pub fn event_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }
}

/// Settings for building and rendering digest pages.
#[derive(Debug, Clone)]
pub struct DigestOptions {
    /// Portal root; relative links in scraped markup resolve against it.
    pub portal_base: String,
    /// Prefix for the previous/next week links. Empty gives relative links.
    pub site_base: String,
    /// Page whose stylesheets the digest borrows.
    pub dashboard_url: String,
    /// Events visited per day, if capped.
    pub day_limit: Option<usize>,
}

/// One event as it appears on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub event: CalendarEvent,
    pub page: ScrapedEventPage,
}

impl DigestEntry {
    pub fn has_prep(&self) -> bool {
        self.page.has_prep()
    }
}

/// A fully scraped week, ready to render.
#[derive(Debug, Clone)]
pub struct DigestPage {
    pub window: WeekWindow,
    pub days: BTreeMap<NaiveDate, Vec<DigestEntry>>,
    pub stylesheets: Vec<Stylesheet>,
    pub generated_at: NaiveDateTime,
}

impl DigestPage {
    pub fn file_name(&self) -> String {
        self.window.page_name()
    }

    pub fn render(&self, options: &DigestOptions) -> String {
        render::render_page(self, options)
    }

    /// Write `{week_start}.html` into `out_dir`, replacing an older copy.
    pub fn write_to(&self, out_dir: &Path, options: &DigestOptions) -> CourseKitResult<PathBuf> {
        std::fs::create_dir_all(out_dir)?;

        let path = out_dir.join(self.file_name());
        let temp = out_dir.join(format!(".{}.tmp", self.file_name()));

        std::fs::write(&temp, self.render(options))?;
        std::fs::rename(&temp, &path)?;

        tracing::info!(path = %path.display(), "Wrote digest page");
        Ok(path)
    }
}

/// Scrape every event of `digest` and the dashboard's stylesheets.
///
/// Events whose page cannot be fetched or does not match the markup are left
/// off the page, but their day is kept. A lost session aborts.
pub fn build_page<F, E>(
    digest: &WeeklyDigest,
    fetch: &F,
    extractor: &E,
    options: &DigestOptions,
    generated_at: NaiveDateTime,
) -> CourseKitResult<DigestPage>
where
    F: Fetch + ?Sized,
    E: PageExtractor + ?Sized,
{
    tracing::info!(week = %digest.window(), events = digest.event_count(), "Building digest");

    let stylesheets = dashboard_stylesheets(fetch, extractor, &options.dashboard_url)?;

    let mut days = BTreeMap::new();
    for (date, events) in digest.days() {
        tracing::info!(%date, "Fetching content for day");

        let mut entries = Vec::new();
        for event in events.iter().take(options.day_limit.unwrap_or(usize::MAX)) {
            let html = match fetch.page(&event.detail_url) {
                Ok(html) => html,
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    tracing::warn!(url = %event.detail_url, error = %e, "Could not fetch event page");
                    continue;
                }
            };

            match extractor.extract(&html, event) {
                Ok(page) => entries.push(DigestEntry {
                    event: event.clone(),
                    page,
                }),
                Err(reason) => tracing::info!(title = %event.title, %reason, "Skipping event"),
            }
        }

        days.insert(*date, entries);
    }

    Ok(DigestPage {
        window: digest.window(),
        days,
        stylesheets,
        generated_at,
    })
}

fn dashboard_stylesheets<F, E>(
    fetch: &F,
    extractor: &E,
    dashboard_url: &str,
) -> CourseKitResult<Vec<Stylesheet>>
where
    F: Fetch + ?Sized,
    E: PageExtractor + ?Sized,
{
    let base = match Url::parse(dashboard_url) {
        Ok(base) => base,
        Err(e) => {
            tracing::warn!(url = dashboard_url, error = %e, "Invalid dashboard URL");
            return Ok(Vec::new());
        }
    };

    match fetch.page(dashboard_url) {
        Ok(html) => Ok(extractor.stylesheets(&html, &base)),
        Err(e) if e.is_auth() => Err(e),
        Err(e) => {
            tracing::warn!(url = dashboard_url, error = %e, "Could not fetch portal stylesheets");
            Ok(Vec::new())
        }
    }
}
