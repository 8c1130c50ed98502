use chrono::NaiveDate;
use maud::{DOCTYPE, Markup, PreEscaped, html};

use super::{DigestEntry, DigestOptions, DigestPage};
use crate::week::WeekWindow;

const SCRIPT: &str = include_str!("../../assets/summary.js");
const STYLE: &str = include_str!("../../assets/summary.css");

const DISCLAIMER: &str = "DISCLAIMER: Don't trust any of this. The page reflects whatever \
    the portal was showing when it was generated. To-do state is stored in your browser only.";

pub(super) fn render_page(page: &DigestPage, options: &DigestOptions) -> String {
    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "Summary of week " (page.window.to_string()) }
                base href=(options.portal_base);
                @for sheet in &page.stylesheets {
                    link rel="stylesheet" type="text/css" href=(sheet.href) media=[sheet.media.as_deref()];
                }
                style type="text/css" { (PreEscaped(STYLE)) }
            }
            body {
                div.note {
                    span.label.label-important { "Note:" }
                    " Click event headings to see preparation notes and materials."
                }
                div.week-nav {
                    div.prev { a href=(week_href(&options.site_base, page.window.previous())) { "<< prev week" } }
                    div.next { a href=(week_href(&options.site_base, page.window.next())) { "next week >>" } }
                }
                @for (date, entries) in &page.days {
                    (render_day(*date, entries))
                }
                footer {
                    hr;
                    p { "Last Updated: " (page.generated_at.format("%Y-%m-%d %H:%M").to_string()) }
                    p { (DISCLAIMER) }
                }
                script type="text/javascript" { (PreEscaped(SCRIPT)) }
            }
        }
    };
    markup.into_string()
}

fn week_href(site_base: &str, window: WeekWindow) -> String {
    let site_base = site_base.trim_end_matches('/');
    if site_base.is_empty() {
        window.page_name()
    } else {
        format!("{site_base}/{}", window.page_name())
    }
}

/// A day heading and its events. A day whose events were all left off keeps
/// its heading over an empty body.
fn render_day(date: NaiveDate, entries: &[DigestEntry]) -> Markup {
    html! {
        h1.date { (date.format("%a, %b %d %Y").to_string()) }
        div.day {
            @for (n, entry) in entries.iter().enumerate() {
                (render_entry(date, n, entry))
            }
        }
    }
}

fn render_entry(date: NaiveDate, n: usize, entry: &DigestEntry) -> Markup {
    let todo_id = entry
        .event
        .portal_id()
        .unwrap_or_else(|| format!("{}_{n}", date.format("%Y%m%d")));

    let required = entry.page.required_prep_html.as_deref();
    // A list inside the prep block has already been emitted with it.
    let lists = entry
        .page
        .resource_lists_html
        .iter()
        .filter(|list| !required.is_some_and(|prep| prep.contains(list.as_str())));

    html! {
        div.event {
            div.event-heading.no-prep[!entry.has_prep()] {
                div.event-todo { input id={ "chk_" (todo_id) } type="checkbox" class="todo"; }
                div.event-title {
                    h2 {
                        (entry.event.title) " "
                        a href=(entry.event.detail_url) style="font-size: x-small" target="_blank" {
                            span.icon-globe {}
                        }
                    }
                }
            }
            div.event-prep {
                @if let Some(required) = required {
                    div { (PreEscaped(required)) }
                }
                @for list in lists {
                    (PreEscaped(list))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDateTime;

    use super::*;
    use crate::event::CalendarEvent;
    use crate::scrape::{ScrapedEventPage, Stylesheet};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn entry(title: &str, url: &str, prep: Option<&str>) -> DigestEntry {
        DigestEntry {
            event: CalendarEvent::new(at(10, 9), title, url),
            page: ScrapedEventPage {
                course_code: "MEDS245".into(),
                formatted_date: "2024-01-10".into(),
                class_title: title.into(),
                required_prep_html: prep.map(str::to_string),
                resource_lists_html: vec![],
                resource_links: vec![],
            },
        }
    }

    fn page(entries: Vec<DigestEntry>) -> DigestPage {
        let mut days = BTreeMap::new();
        days.insert(at(10, 0).date(), entries);
        DigestPage {
            window: WeekWindow::containing(at(10, 0).date()),
            days,
            stylesheets: vec![Stylesheet {
                href: "https://portal.example.edu/central/css/main.css".into(),
                media: Some("screen".into()),
            }],
            generated_at: at(7, 6),
        }
    }

    fn options(site_base: &str) -> DigestOptions {
        DigestOptions {
            portal_base: "https://portal.example.edu/central".into(),
            site_base: site_base.into(),
            dashboard_url: "https://portal.example.edu/central/dashboard".into(),
            day_limit: None,
        }
    }

    #[test]
    fn test_page_head_and_navigation() {
        let html = render_page(&page(vec![]), &options("https://example.com/digest/"));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Summary of week 2024-01-08</title>"));
        assert!(html.contains(r#"<base href="https://portal.example.edu/central">"#));
        assert!(html.contains(
            r#"<link rel="stylesheet" type="text/css" href="https://portal.example.edu/central/css/main.css" media="screen">"#
        ));
        assert!(html.contains(r#"href="https://example.com/digest/2024-01-01.html""#));
        assert!(html.contains(r#"href="https://example.com/digest/2024-01-15.html""#));
        assert!(html.contains("Last Updated: 2024-01-07 06:00"));
        assert!(html.contains("localStorage"));
    }

    #[test]
    fn test_empty_site_base_gives_relative_links() {
        let html = render_page(&page(vec![]), &options(""));
        assert!(html.contains(r#"<a href="2024-01-01.html">"#));
        assert!(html.contains(r#"<a href="2024-01-15.html">"#));
    }

    #[test]
    fn test_event_entry_markup() {
        let html = render_page(
            &page(vec![
                entry(
                    "Heart & Lungs",
                    "https://portal.example.edu/central/events?id=101",
                    Some("<h3>Required Preparation</h3><p>Read.</p>"),
                ),
                entry("Quiet Study", "https://portal.example.edu/central/events", None),
            ]),
            &options(""),
        );

        assert!(html.contains(r#"<h1 class="date">Wed, Jan 10 2024</h1>"#));
        assert!(html.contains(r#"id="chk_101""#));
        assert!(html.contains("<h2>Heart &amp; Lungs <a"));
        assert!(html.contains("<div><h3>Required Preparation</h3><p>Read.</p></div>"));
        assert!(html.contains(r#"<div class="event-heading no-prep">"#));
        assert!(html.contains(r#"id="chk_20240110_1""#));
    }

    #[test]
    fn test_resource_list_inside_prep_is_not_repeated() {
        let list = r#"<ul class="resource-list"><li>Slides</li></ul>"#;
        let mut with_list = entry(
            "Heart Sounds",
            "https://portal.example.edu/central/events?id=1",
            Some(&format!("<h3>Required Preparation</h3>{list}")),
        );
        with_list.page.resource_lists_html = vec![list.to_string()];

        let html = render_page(&page(vec![with_list]), &options(""));

        assert_eq!(html.matches("resource-list").count(), 1);
    }

    #[test]
    fn test_day_without_entries_keeps_heading() {
        let html = render_page(&page(vec![]), &options(""));

        assert!(html.contains(r#"<h1 class="date">Wed, Jan 10 2024</h1><div class="day"></div>"#));
    }

    #[test]
    fn test_stylesheet_href_is_escaped() {
        let mut page = page(vec![]);
        page.stylesheets = vec![Stylesheet {
            href: r#"/css/a.css?x=1&y="2""#.into(),
            media: None,
        }];

        let html = render_page(&page, &options(""));

        assert!(html.contains(
            r#"<link rel="stylesheet" type="text/css" href="/css/a.css?x=1&amp;y=&quot;2&quot;">"#
        ));
    }
}
