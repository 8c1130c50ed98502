//! File and environment configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::credentials::Password;
use crate::error::{CourseKitError, CourseKitResult};

static DEFAULT_PORTAL_BASE: &str = "https://meds.queensu.ca/central";
static DEFAULT_ICAL_URL: &str = "http://meds.queensu.ca/central/calendars/2021.ics";
static DEFAULT_FILE_URL_TEMPLATE: &str =
    "https://meds.queensu.ca/central/?url=%2Fmedicine%2Ffile-event.php%3Fid%3D{id}";

fn default_portal_base() -> String {
    DEFAULT_PORTAL_BASE.to_string()
}

fn default_ical_url() -> String {
    DEFAULT_ICAL_URL.to_string()
}

fn default_file_url_template() -> String {
    DEFAULT_FILE_URL_TEMPLATE.to_string()
}

fn default_login_marker() -> String {
    "login".to_string()
}

fn default_dashboard_path() -> String {
    "/dashboard".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_youtube_dl_file() -> PathBuf {
    PathBuf::from("youtube-dl.sh")
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Settings read from `~/.config/coursekit/config.toml` and `COURSEKIT_*`
/// environment variables. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_ical_url")]
    pub ical_url: String,

    /// Portal root; event pages and the dashboard live under it.
    #[serde(default = "default_portal_base")]
    pub portal_base: String,

    /// Where the login form posts to. Defaults to `portal_base`.
    pub login_url: Option<String>,

    /// Substring of the URL the portal redirects to when a session is missing.
    #[serde(default = "default_login_marker")]
    pub login_marker: String,

    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,

    /// Download URL for a resource, `{id}` is replaced by the file id.
    #[serde(default = "default_file_url_template")]
    pub file_url_template: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Prefix for week navigation links; empty means relative links.
    #[serde(default)]
    pub site_base: String,

    /// Cohort label an event page must list to be processed.
    pub audience: Option<String>,

    /// Where to keep a copy of the feed. Unset means always fetch.
    pub feed_cache: Option<PathBuf>,

    #[serde(default = "default_youtube_dl_file")]
    pub youtube_dl_file: PathBuf,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    pub username: Option<String>,
    pub password: Option<Password>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ical_url: default_ical_url(),
            portal_base: default_portal_base(),
            login_url: None,
            login_marker: default_login_marker(),
            dashboard_path: default_dashboard_path(),
            file_url_template: default_file_url_template(),
            data_dir: default_data_dir(),
            out_dir: default_out_dir(),
            site_base: String::new(),
            audience: None,
            feed_cache: None,
            youtube_dl_file: default_youtube_dl_file(),
            request_timeout_secs: default_request_timeout_secs(),
            username: None,
            password: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> CourseKitResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CourseKitError::Config("Could not determine config directory".into()))?
            .join("coursekit");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default config path plus the environment.
    pub fn load() -> CourseKitResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit file (which may be missing) plus the environment.
    pub fn load_from(path: &Path) -> CourseKitResult<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("COURSEKIT"))
            .build()
            .map_err(|e| CourseKitError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CourseKitError::Config(e.to_string()))?;

        Ok(settings.expanded())
    }

    /// Expand `~` in every path setting.
    fn expanded(mut self) -> Self {
        self.data_dir = expand(&self.data_dir);
        self.out_dir = expand(&self.out_dir);
        self.youtube_dl_file = expand(&self.youtube_dl_file);
        self.feed_cache = self.feed_cache.as_deref().map(expand);
        self
    }

    pub fn login_url(&self) -> &str {
        self.login_url.as_deref().unwrap_or(&self.portal_base)
    }

    /// Absolute URL of the dashboard page the digest borrows stylesheets from.
    pub fn dashboard_url(&self) -> String {
        format!(
            "{}/{}",
            self.portal_base.trim_end_matches('/'),
            self.dashboard_path.trim_start_matches('/')
        )
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.toml")).expect("Should load");

        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.login_url(), settings.portal_base);
        assert_eq!(settings.request_timeout_secs, 60);
        assert_eq!(settings.feed_cache, None);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "portal_base = \"https://portal.example.edu/central/\"\n\
             audience = \"Class of 2026\"\n\
             data_dir = \"downloads\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).expect("Should load");

        assert_eq!(settings.audience.as_deref(), Some("Class of 2026"));
        assert_eq!(settings.data_dir, PathBuf::from("downloads"));
        assert_eq!(
            settings.dashboard_url(),
            "https://portal.example.edu/central/dashboard"
        );
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, CourseKitError::Config(_)));
    }
}
