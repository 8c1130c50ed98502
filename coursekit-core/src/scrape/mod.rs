//! Extracting structured data from portal event pages.
//!
//! The portal's markup is the contract here, so it is kept behind the
//! [`PageExtractor`] trait. Each markup version gets its own implementation
//! and its own fixture tests.

mod medtech;

pub use medtech::MedtechExtractor;

use thiserror::Error;
use url::Url;

use crate::event::CalendarEvent;

/// A link on an event page that may point at a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    pub href: String,
    /// Text of the label next to the link, e.g. "Lecture Slides 2.3 MB".
    pub display_label: Option<String>,
    /// Label text with the size stripped. Present only when the label ends in
    /// a recognised size unit; links without it are not files.
    pub inferred_kind: Option<String>,
}

/// Everything pulled out of one event page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedEventPage {
    pub course_code: String,
    pub formatted_date: String,
    pub class_title: String,
    /// The "Required Preparation" heading and everything after it.
    pub required_prep_html: Option<String>,
    pub resource_lists_html: Vec<String>,
    pub resource_links: Vec<ResourceLink>,
}

impl ScrapedEventPage {
    /// Whether the digest has anything to show under this event.
    pub fn has_prep(&self) -> bool {
        self.required_prep_html.is_some() || !self.resource_lists_html.is_empty()
    }
}

/// A stylesheet link borrowed from the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub href: String,
    pub media: Option<String>,
}

/// Why an event page was passed over. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageSkip {
    #[error("no #page-top element")]
    MissingPageTop,

    #[error("no course code link before #page-top")]
    MissingCourseCode,

    #[error("audience is {found:?}, not '{expected}'")]
    OtherAudience { expected: String, found: Vec<String> },
}

/// One implementation per version of the portal's event-page markup.
pub trait PageExtractor {
    fn extract(&self, html: &str, event: &CalendarEvent) -> Result<ScrapedEventPage, PageSkip>;

    /// Stylesheets referenced by a portal page, made absolute against `base`.
    fn stylesheets(&self, html: &str, base: &Url) -> Vec<Stylesheet>;
}

/// Split a resource label such as "Lecture Slides 2.3 MB" into its kind
/// ("Lecture Slides"). Returns None unless the label ends in KB or MB.
pub fn file_kind_from_label(label: &str) -> Option<String> {
    let label = label.trim();
    if !(label.ends_with("KB") || label.ends_with("MB")) {
        return None;
    }

    let tokens: Vec<&str> = label.split_whitespace().collect();
    let keep = tokens.len().saturating_sub(2);
    Some(tokens[..keep].join(" "))
}
