//! Cookie-based portal session.

use std::sync::LazyLock;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_DISPOSITION;
use scraper::{Html, Selector};

use super::{Fetch, PortalResponse};
use crate::credentials::Credentials;
use crate::error::{CourseKitError, CourseKitResult};

static PASSWORD_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[type="password"], input[name="password"]"#)
        .expect("password selector is valid")
});

/// True when the markup carries a password field, i.e. the portal served
/// its login form instead of the page asked for.
pub(crate) fn looks_like_login_page(html: &str) -> bool {
    if !html.contains("password") {
        return false;
    }
    Html::parse_document(html)
        .select(&PASSWORD_INPUT)
        .next()
        .is_some()
}

/// One logged-in portal user. Owns the HTTP client and its cookie jar; every
/// event-page and resource request goes through it.
pub struct Session {
    client: Client,
    login_marker: String,
    username: String,
}

impl Session {
    /// Post the login form once and verify the portal accepted it.
    pub fn login(
        client: Client,
        login_url: &str,
        login_marker: &str,
        credentials: &Credentials,
    ) -> CourseKitResult<Self> {
        tracing::info!(url = login_url, user = %credentials.username, "Logging in");

        let response = client
            .post(login_url)
            .form(&credentials.login_form())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(CourseKitError::NotAuthenticated(format!(
                "login returned status {}",
                status.as_u16()
            )));
        }

        let body = response.text()?;
        if looks_like_login_page(&body) {
            return Err(CourseKitError::NotAuthenticated(format!(
                "portal rejected the credentials for {}",
                credentials.username
            )));
        }

        tracing::debug!("Login accepted");

        Ok(Session {
            client,
            login_marker: login_marker.to_string(),
            username: credentials.username.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Redirected to a URL carrying the login marker: the session is gone.
    fn bounced_to_login(&self, requested: &str, response: &Response) -> bool {
        let final_url = response.url().as_str();
        !self.login_marker.is_empty()
            && final_url != requested
            && final_url.contains(&self.login_marker)
    }
}

impl Fetch for Session {
    fn get(&self, url: &str) -> CourseKitResult<PortalResponse> {
        tracing::debug!(url, "GET");

        let response = self.client.get(url).send()?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(CourseKitError::NotAuthenticated(format!(
                "{url} returned status {}",
                status.as_u16()
            )));
        }
        if self.bounced_to_login(url, &response) {
            return Err(CourseKitError::NotAuthenticated(format!(
                "{url} redirected to {}",
                response.url()
            )));
        }
        if !status.is_success() {
            return Err(CourseKitError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        Ok(PortalResponse::new(
            status.as_u16(),
            final_url,
            content_disposition,
            Box::new(response),
        ))
    }
}
