//! ICS feed parsing.
//!
//! Reads the portal's calendar feed according to RFC 5545, keeping only what
//! the download and summary tools consume.

mod parse;

pub use parse::parse_events;
