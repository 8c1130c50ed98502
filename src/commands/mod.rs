pub mod download;
pub mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::Args;
use coursekit_core::credentials::{self, Password, StaticCredentials};
use coursekit_core::feed::Feed;
use coursekit_core::portal::{self, Session};
use coursekit_core::{RunConfig, Settings, Verbosity};
use owo_colors::OwoColorize;

use crate::credentials::PromptCredentials;
use crate::utils::tui::create_spinner;

/// Options shared by every command that talks to the portal.
#[derive(Args, Debug, Clone, Default)]
pub struct PortalArgs {
    /// Portal username (prompted for if not configured)
    #[arg(long)]
    pub user: Option<String>,

    /// Portal password (prompted for if not configured)
    #[arg(long = "pass")]
    pub pass: Option<String>,

    /// Calendar feed URL
    #[arg(long)]
    pub ical: Option<String>,

    /// Keep a copy of the feed here and reuse it on later runs
    #[arg(long, value_name = "PATH")]
    pub feed_cache: Option<PathBuf>,

    /// Ignore the cached feed and download it again
    #[arg(long)]
    pub refresh_feed: bool,
}

/// Load settings and layer the command-line flags over them.
pub fn run_config(args: &PortalArgs, verbosity: Verbosity) -> Result<RunConfig> {
    let settings = Settings::load().context("Failed to load configuration")?;
    Ok(apply_portal_args(settings, args, verbosity))
}

fn apply_portal_args(mut settings: Settings, args: &PortalArgs, verbosity: Verbosity) -> RunConfig {
    if let Some(url) = &args.ical {
        settings.ical_url = url.clone();
    }
    if let Some(path) = &args.feed_cache {
        settings.feed_cache = Some(path.clone());
    }

    let mut config = RunConfig::new(settings);
    config.verbosity = verbosity;
    config.refresh_feed = args.refresh_feed;
    config
}

/// A parsed feed and a logged-in session.
pub struct Portal {
    pub feed: Feed,
    pub session: Session,
}

/// Ask for any missing credentials, load the feed, then log in.
pub fn connect(config: &RunConfig, args: &PortalArgs) -> Result<Portal> {
    let settings = &config.settings;

    let flags = StaticCredentials::new(args.user.clone(), args.pass.clone().map(Password::new));
    let configured = StaticCredentials::new(settings.username.clone(), settings.password.clone());
    let credentials = credentials::resolve(&[&flags, &configured, &PromptCredentials])?;

    let client = portal::http_client(config.request_timeout())?;

    let source = config.feed_source();
    let spinner = create_spinner(format!("Loading feed {}", source.url.dimmed()));
    let feed = Feed::load(&source, &client);
    spinner.finish_and_clear();
    let feed = feed.with_context(|| format!("Failed to load calendar feed {}", source.url))?;
    println!("{} {} events in feed", "✓".green(), feed.len());

    let spinner = create_spinner(format!("Logging in as {}", credentials.username));
    let session = Session::login(
        client,
        settings.login_url(),
        &settings.login_marker,
        &credentials,
    );
    spinner.finish_and_clear();
    let session = session.context("Failed to log in")?;
    println!("{} Logged in as {}", "✓".green(), session.username());

    Ok(Portal { feed, session })
}

/// Parse the positional date argument.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or anything fuzzydate understands
/// ("today", "last monday").
pub fn parse_date(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M") {
        return Ok(dt);
    }

    fuzzydate::parse(input).map_err(|_| anyhow::anyhow!("Could not parse date: \"{}\"", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date_is_midnight() {
        let dt = parse_date("2024-01-10").unwrap();
        assert_eq!(dt.to_string(), "2024-01-10 00:00:00");
    }

    #[test]
    fn test_parse_date_with_time() {
        let dt = parse_date("2024-01-10T08:30").unwrap();
        assert_eq!(dt.to_string(), "2024-01-10 08:30:00");
    }

    #[test]
    fn test_parse_natural_language() {
        assert!(parse_date("tomorrow").is_ok());
        assert!(parse_date("not a date at all").is_err());
    }

    #[test]
    fn test_ical_flag_overrides_settings() {
        let args = PortalArgs {
            ical: Some("https://portal.example.edu/feed.ics".into()),
            refresh_feed: true,
            ..Default::default()
        };

        let config = apply_portal_args(Settings::default(), &args, Verbosity::Verbose);

        assert_eq!(config.settings.ical_url, "https://portal.example.edu/feed.ics");
        assert!(config.refresh_feed);
        assert_eq!(config.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn test_feed_cache_only_with_flag() {
        let config = apply_portal_args(Settings::default(), &PortalArgs::default(), Verbosity::Quiet);
        assert_eq!(config.feed_source().cache, None);

        let args = PortalArgs {
            feed_cache: Some(PathBuf::from("feed.ics")),
            ..Default::default()
        };
        let config = apply_portal_args(Settings::default(), &args, Verbosity::Quiet);
        assert_eq!(config.feed_source().cache, Some(PathBuf::from("feed.ics")));
    }
}
