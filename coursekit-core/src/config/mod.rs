//! Configuration types for coursekit.
//!
//! `Settings` is what lives on disk and in the environment; `RunConfig` is
//! the value threaded through a single run, with command-line toggles
//! applied on top.

mod settings;

use std::time::Duration;

pub use settings::Settings;

use crate::resource::DownloadOptions;
use crate::digest::DigestOptions;
use crate::feed::FeedSource;

const TEST_MODE_DAY_LIMIT: usize = 3;

/// How chatty a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    #[default]
    Quiet,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        match (verbose, debug) {
            (_, true) => Verbosity::Debug,
            (true, false) => Verbosity::Verbose,
            (false, false) => Verbosity::Quiet,
        }
    }

    pub fn is_verbose(&self) -> bool {
        *self >= Verbosity::Verbose
    }

    /// Default `tracing` filter directive for this level.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
        }
    }
}

/// Everything one invocation needs, passed by reference to each stage.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub settings: Settings,
    pub verbosity: Verbosity,
    /// Report what would be written without writing it.
    pub dry_run: bool,
    /// Queue external video links for youtube-dl instead of skipping them.
    pub youtube_dl: bool,
    /// Ignore the feed cache and refresh it.
    pub refresh_feed: bool,
    /// Cap each digest day at a few events.
    pub test_mode: bool,
}

impl RunConfig {
    pub fn new(settings: Settings) -> Self {
        RunConfig {
            settings,
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.request_timeout_secs)
    }

    pub fn feed_source(&self) -> FeedSource {
        FeedSource {
            url: self.settings.ical_url.clone(),
            cache: self.settings.feed_cache.clone(),
            refresh: self.refresh_feed,
        }
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            data_dir: self.settings.data_dir.clone(),
            file_url_template: self.settings.file_url_template.clone(),
            dry_run: self.dry_run,
            youtube_dl_file: self
                .youtube_dl
                .then(|| self.settings.youtube_dl_file.clone()),
        }
    }

    /// Events visited per digest day, if capped.
    pub fn digest_day_limit(&self) -> Option<usize> {
        self.test_mode.then_some(TEST_MODE_DAY_LIMIT)
    }

    pub fn digest_options(&self) -> DigestOptions {
        DigestOptions {
            portal_base: self.settings.portal_base.clone(),
            site_base: self.settings.site_base.clone(),
            dashboard_url: self.settings.dashboard_url(),
            day_limit: self.digest_day_limit(),
        }
    }
}
