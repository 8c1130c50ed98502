//! Portal login credentials and the sources that can supply them.
//!
//! Credentials never leave process memory. Sources are tried in order at the
//! program boundary (flags, then configuration and environment, then an
//! interactive prompt) and the first one to answer wins, per field.

use std::fmt;

use serde::Deserialize;

use crate::error::{CourseKitError, CourseKitResult};

/// A password that does not show up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Password(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(****)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Password,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: Password::new(password),
        }
    }

    /// Form fields posted to the portal's login handler.
    pub fn login_form(&self) -> [(&'static str, &str); 4] {
        [
            ("username", self.username.as_str()),
            ("password", self.password.expose()),
            ("submit", "Login"),
            ("action", "login"),
        ]
    }
}

/// Something that can supply a username and/or password.
pub trait CredentialProvider {
    fn username(&self) -> CourseKitResult<Option<String>>;

    fn password(&self, username: &str) -> CourseKitResult<Option<Password>>;
}

/// Values known up front: command-line flags, config file or environment.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    pub username: Option<String>,
    pub password: Option<Password>,
}

impl StaticCredentials {
    pub fn new(username: Option<String>, password: Option<Password>) -> Self {
        StaticCredentials { username, password }
    }
}

impl CredentialProvider for StaticCredentials {
    fn username(&self) -> CourseKitResult<Option<String>> {
        Ok(self.username.clone().filter(|u| !u.is_empty()))
    }

    fn password(&self, _username: &str) -> CourseKitResult<Option<Password>> {
        Ok(self.password.clone())
    }
}

/// Ask each provider in turn until both fields are known.
pub fn resolve(providers: &[&dyn CredentialProvider]) -> CourseKitResult<Credentials> {
    let mut username = None;
    for provider in providers {
        if let Some(u) = provider.username()? {
            username = Some(u);
            break;
        }
    }
    let username =
        username.ok_or_else(|| CourseKitError::Credentials("no username supplied".into()))?;

    for provider in providers {
        if let Some(password) = provider.password(&username)? {
            return Ok(Credentials { username, password });
        }
    }

    Err(CourseKitError::Credentials(format!(
        "no password supplied for {username}"
    )))
}
