//! Error types for coursekit.

use thiserror::Error;

/// Errors that can occur while loading the feed, talking to the portal or
/// writing output.
#[derive(Error, Debug)]
pub enum CourseKitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Download of {url} interrupted: {source}")]
    Transfer {
        url: String,
        source: std::io::Error,
    },

    #[error("Page structure not recognised: {0}")]
    Scrape(String),

    #[error("No credentials available: {0}")]
    Credentials(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CourseKitError {
    /// True for errors that mean the portal session cannot be trusted.
    pub fn is_auth(&self) -> bool {
        matches!(self, CourseKitError::NotAuthenticated(_))
    }

    /// True for errors that end a run: a lost session, or output that cannot
    /// be written. Per-request failures are not fatal.
    pub fn is_fatal(&self) -> bool {
        self.is_auth() || matches!(self, CourseKitError::Io(_))
    }
}

/// Result type alias for coursekit operations.
pub type CourseKitResult<T> = Result<T, CourseKitError>;
