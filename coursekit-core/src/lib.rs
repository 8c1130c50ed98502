//! Core library for coursekit.
//!
//! This crate provides everything the CLI drives:
//! - `feed` and `ics` for loading the portal's calendar feed
//! - `portal` for the authenticated session and the `Fetch` seam
//! - `scrape` for pulling structured data out of event pages
//! - `resource` and `download` for saving attached files
//! - `week` and `digest` for the weekly summary pages

pub mod config;
pub mod credentials;
pub mod digest;
pub mod download;
pub mod error;
pub mod event;
pub mod feed;
pub mod ics;
pub mod portal;
pub mod resource;
pub mod scrape;
pub mod week;

pub use config::{RunConfig, Settings, Verbosity};
pub use error::{CourseKitError, CourseKitResult};
pub use event::CalendarEvent;
pub use feed::{Feed, FeedSource};
pub use week::WeekWindow;
