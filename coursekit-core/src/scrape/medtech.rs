//! Extractor for the MEdTech Central event page markup.
//!
//! Markup contract:
//! - `#page-top` holds the class title; the last anchor before it in
//!   document order reads "CODE: Course name".
//! - an `h3` reading "Required Preparation" starts the prep block, which runs
//!   to the end of its parent.
//! - `.resource-list` blocks list the event's resources.
//! - `a.resource-link` anchors carry `?id=<n>` hrefs; the next `.label-info`
//!   element holds "<kind> <size> <unit>".
//! - `a.audience-link` anchors name the cohorts an event is for.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use super::{
    PageExtractor, PageSkip, ResourceLink, ScrapedEventPage, Stylesheet, file_kind_from_label,
};
use crate::event::CalendarEvent;

const PAGE_TOP_ID: &str = "page-top";
const PREP_HEADING: &str = "Required Preparation";

static ANCHOR_OR_PAGE_TOP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a, #page-top").expect("static selector"));
static H3: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").expect("static selector"));
static RESOURCE_LIST: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".resource-list").expect("static selector"));
static LINK_OR_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.resource-link, .label-info").expect("static selector"));
static AUDIENCE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.audience-link").expect("static selector"));
static STYLESHEET_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[type="text/css"]"#).expect("static selector"));

/// Scrapes MEdTech event pages.
#[derive(Debug, Clone, Default)]
pub struct MedtechExtractor {
    /// Cohort label a page must list; None accepts every page.
    audience: Option<String>,
}

impl MedtechExtractor {
    pub fn new(audience: Option<String>) -> Self {
        MedtechExtractor {
            audience: audience.filter(|a| !a.trim().is_empty()),
        }
    }

    fn check_audience(&self, doc: &Html) -> Result<(), PageSkip> {
        let Some(expected) = &self.audience else {
            return Ok(());
        };

        let found: Vec<String> = doc.select(&AUDIENCE_LINK).map(|a| text_of(&a)).collect();
        if found.iter().any(|label| label == expected) {
            Ok(())
        } else {
            Err(PageSkip::OtherAudience {
                expected: expected.clone(),
                found,
            })
        }
    }
}

impl PageExtractor for MedtechExtractor {
    fn extract(&self, html: &str, event: &CalendarEvent) -> Result<ScrapedEventPage, PageSkip> {
        let doc = Html::parse_document(html);

        self.check_audience(&doc)?;

        let (page_top, course_anchor) = page_top_and_preceding_anchor(&doc);
        let page_top = page_top.ok_or(PageSkip::MissingPageTop)?;
        let course_code = course_anchor
            .map(|a| course_code_from(&text_of(&a)))
            .filter(|code| !code.is_empty())
            .ok_or(PageSkip::MissingCourseCode)?;

        Ok(ScrapedEventPage {
            course_code,
            formatted_date: event.formatted_date(),
            class_title: text_of(&page_top),
            required_prep_html: required_prep_html(&doc),
            resource_lists_html: doc.select(&RESOURCE_LIST).map(|e| e.html()).collect(),
            resource_links: resource_links(&doc),
        })
    }

    fn stylesheets(&self, html: &str, base: &Url) -> Vec<Stylesheet> {
        Html::parse_document(html)
            .select(&STYLESHEET_LINK)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                let href = base.join(href).ok()?;
                Some(Stylesheet {
                    href: href.to_string(),
                    media: link.value().attr("media").map(str::to_string),
                })
            })
            .collect()
    }
}

/// Whitespace-normalised text content of an element.
fn text_of(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn course_code_from(anchor_text: &str) -> String {
    anchor_text
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// `#page-top`, and the last anchor that precedes it in document order.
fn page_top_and_preceding_anchor(doc: &Html) -> (Option<ElementRef<'_>>, Option<ElementRef<'_>>) {
    let mut last_anchor = None;
    for element in doc.select(&ANCHOR_OR_PAGE_TOP) {
        if element.value().id() == Some(PAGE_TOP_ID) {
            return (Some(element), last_anchor);
        }
        last_anchor = Some(element);
    }
    (None, None)
}

/// The prep heading serialised together with all of its following siblings.
fn required_prep_html(doc: &Html) -> Option<String> {
    let heading = doc
        .select(&H3)
        .find(|h| text_of(h) == PREP_HEADING)?;

    let mut html = heading.html();
    for sibling in heading.next_siblings() {
        match sibling.value() {
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(sibling) {
                    html.push_str(&element.html());
                }
            }
            Node::Text(text) => html.push_str(&html_escape::encode_text(&**text)),
            _ => {}
        }
    }
    Some(html)
}

fn resource_links(doc: &Html) -> Vec<ResourceLink> {
    let elements: Vec<ElementRef<'_>> = doc.select(&LINK_OR_LABEL).collect();
    let is_link = |e: &ElementRef<'_>| {
        e.value().name() == "a" && e.value().classes().any(|c| c == "resource-link")
    };

    let mut links = Vec::new();
    for (i, element) in elements.iter().enumerate() {
        if !is_link(element) {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            tracing::debug!(link = %element.html(), "Resource link without href");
            continue;
        };

        // Next label-info after the link, which may be nested inside it.
        let display_label = elements[i + 1..]
            .iter()
            .find(|e| e.value().classes().any(|c| c == "label-info"))
            .map(text_of);
        let inferred_kind = display_label.as_deref().and_then(file_kind_from_label);

        links.push(ResourceLink {
            href: href.to_string(),
            display_label,
            inferred_kind,
        });
    }
    links
}
