//! Loading the calendar feed from the network or a local cache file.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{CourseKitError, CourseKitResult};
use crate::event::CalendarEvent;
use crate::ics::parse_events;

/// Where the feed text comes from.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub url: String,
    /// Local copy used instead of the network when it exists.
    pub cache: Option<PathBuf>,
    /// Ignore an existing cache and rewrite it from the network.
    pub refresh: bool,
}

/// A fully parsed calendar feed.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    events: Vec<CalendarEvent>,
}

impl Feed {
    pub fn parse(content: &str) -> CourseKitResult<Self> {
        Ok(Feed {
            events: parse_events(content)?,
        })
    }

    /// Fetch (or read from cache) and parse the feed.
    pub fn load(source: &FeedSource, client: &reqwest::blocking::Client) -> CourseKitResult<Self> {
        let content = match source.cache.as_deref() {
            Some(cache) if cache.exists() && !source.refresh => {
                tracing::info!(path = %cache.display(), "Using cached feed");
                std::fs::read_to_string(cache)?
            }
            cache => {
                let content = fetch_feed(&source.url, client)?;
                if let Some(cache) = cache {
                    write_cache(cache, &content)?;
                }
                content
            }
        };

        Self::parse(&content)
    }

    /// Events in feed order.
    pub fn events(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.events.iter()
    }

    /// Events starting at or after `from`; every event when `from` is None.
    pub fn events_since(
        &self,
        from: Option<NaiveDateTime>,
    ) -> impl Iterator<Item = &CalendarEvent> {
        self.events
            .iter()
            .filter(move |e| from.is_none_or(|from| e.start_time >= from))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<Vec<CalendarEvent>> for Feed {
    fn from(events: Vec<CalendarEvent>) -> Self {
        Feed { events }
    }
}

fn fetch_feed(url: &str, client: &reqwest::blocking::Client) -> CourseKitResult<String> {
    tracing::info!(url, "Fetching calendar feed");

    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(CourseKitError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.text()?)
}

fn write_cache(path: &Path, content: &str) -> CourseKitResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    tracing::debug!(path = %path.display(), "Wrote feed cache");
    Ok(())
}
