//! Talking to the course portal.
//!
//! Every request goes through a [`Fetch`] implementation. In production that
//! is an authenticated [`Session`]; tests substitute an in-memory portal.

mod session;

use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

pub use session::Session;

use crate::error::{CourseKitError, CourseKitResult};

/// A response from the portal, with the body left unread.
pub struct PortalResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub content_disposition: Option<String>,
    body: Box<dyn Read>,
}

impl PortalResponse {
    pub fn new(
        status: u16,
        url: impl Into<String>,
        content_disposition: Option<String>,
        body: Box<dyn Read>,
    ) -> Self {
        PortalResponse {
            status,
            url: url.into(),
            content_disposition,
            body,
        }
    }

    pub fn text(mut self) -> CourseKitResult<String> {
        let mut bytes = Vec::new();
        self.body.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Stream the body into `out`, returning the number of bytes written.
    ///
    /// A failed read is a [`CourseKitError::Transfer`]; a failed write is
    /// [`CourseKitError::Io`].
    pub fn copy_to(mut self, out: &mut impl Write) -> CourseKitResult<u64> {
        let mut buf = [0u8; 8192];
        let mut total = 0u64;
        loop {
            let n = match self.body.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(CourseKitError::Transfer {
                        url: self.url,
                        source,
                    });
                }
            };
            out.write_all(&buf[..n])?;
            total += n as u64;
        }
    }
}

impl fmt::Debug for PortalResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalResponse")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("content_disposition", &self.content_disposition)
            .finish_non_exhaustive()
    }
}

/// Issues requests as the logged-in portal user.
pub trait Fetch {
    /// GET `url`. Implementations must fail with
    /// [`CourseKitError::NotAuthenticated`] rather than hand back a login page.
    fn get(&self, url: &str) -> CourseKitResult<PortalResponse>;

    /// GET an HTML page and return its markup.
    fn page(&self, url: &str) -> CourseKitResult<String> {
        let response = self.get(url)?;
        let final_url = response.url.clone();
        let body = response.text()?;

        if session::looks_like_login_page(&body) {
            return Err(CourseKitError::NotAuthenticated(format!(
                "{final_url} returned the login form"
            )));
        }

        Ok(body)
    }
}

/// Blocking client shared by the feed loader and the portal session.
pub fn http_client(timeout: Duration) -> CourseKitResult<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(timeout)
        .user_agent(concat!("coursekit/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("connection reset"))
        }
    }

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_copy_to_counts_bytes() {
        let response = PortalResponse::new(200, "u", None, Box::new(Cursor::new(b"slides".to_vec())));
        let mut out = Vec::new();
        assert_eq!(response.copy_to(&mut out).unwrap(), 6);
        assert_eq!(out, b"slides");
    }

    #[test]
    fn test_copy_to_separates_read_and_write_failures() {
        let response = PortalResponse::new(200, "u", None, Box::new(Broken));
        let err = response.copy_to(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, CourseKitError::Transfer { .. }));

        let response = PortalResponse::new(200, "u", None, Box::new(Cursor::new(b"x".to_vec())));
        let err = response.copy_to(&mut Broken).unwrap_err();
        assert!(matches!(err, CourseKitError::Io(_)));
    }
}
