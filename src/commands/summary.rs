use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use coursekit_core::digest::{DigestOptions, WeeklyDigest, build_page};
use coursekit_core::feed::Feed;
use coursekit_core::portal::Fetch;
use coursekit_core::scrape::{MedtechExtractor, PageExtractor};
use coursekit_core::{RunConfig, WeekWindow};
use owo_colors::OwoColorize;

use super::{PortalArgs, connect, parse_date};
use crate::utils::tui::create_spinner;

/// Optional work after the main page is written.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extras {
    pub pre_post_week: bool,
    pub link_index_html: bool,
}

pub fn run(config: &RunConfig, args: &PortalArgs, date: Option<&str>, extras: Extras) -> Result<()> {
    let reference = match date {
        Some(date) => parse_date(date)?,
        None => Local::now().naive_local(),
    };
    let window = WeekWindow::containing(reference.date());
    tracing::info!(%reference, week = %window, "Week of interest");

    let portal = connect(config, args)?;
    let extractor = MedtechExtractor::new(config.settings.audience.clone());
    let options = config.digest_options();
    let out_dir = config.settings.out_dir.as_path();

    let page = write_week(window, &portal.feed, &portal.session, &extractor, &options, out_dir)?;

    if extras.link_index_html {
        let index = link_index(out_dir, &page)?;
        println!("{} {} -> {}", "✓".green(), index.display(), window.page_name());
    }

    if extras.pre_post_week {
        for adjacent in [window.previous(), window.next()] {
            write_week(adjacent, &portal.feed, &portal.session, &extractor, &options, out_dir)?;
        }
    }

    Ok(())
}

fn write_week<F, E>(
    window: WeekWindow,
    feed: &Feed,
    fetch: &F,
    extractor: &E,
    options: &DigestOptions,
    out_dir: &Path,
) -> Result<PathBuf>
where
    F: Fetch + ?Sized,
    E: PageExtractor + ?Sized,
{
    let digest = WeeklyDigest::for_window(window, feed);

    let spinner = create_spinner(format!(
        "Building week of {} ({} events)",
        window,
        digest.event_count()
    ));
    let page = build_page(&digest, fetch, extractor, options, Local::now().naive_local());
    spinner.finish_and_clear();
    let page = page.with_context(|| format!("Failed to build the page for week {window}"))?;

    let path = page
        .write_to(out_dir, options)
        .with_context(|| format!("Failed to write {}", window.page_name()))?;

    let entries: usize = page.days.values().map(Vec::len).sum();
    println!(
        "{} {} {}",
        "✓".green(),
        path.display(),
        format!("({entries} events)").dimmed()
    );

    Ok(path)
}

/// Point `out_dir/index.html` at `page`, replacing whatever was there.
fn link_index(out_dir: &Path, page: &Path) -> Result<PathBuf> {
    let index = out_dir.join("index.html");
    if index.symlink_metadata().is_ok() {
        std::fs::remove_file(&index)
            .with_context(|| format!("Failed to remove {}", index.display()))?;
    }

    #[cfg(unix)]
    {
        let target = page.file_name().map(PathBuf::from).unwrap_or_else(|| page.to_path_buf());
        std::os::unix::fs::symlink(&target, &index)
            .with_context(|| format!("Failed to link {}", index.display()))?;
    }
    #[cfg(not(unix))]
    {
        std::fs::copy(page, &index).with_context(|| format!("Failed to copy to {}", index.display()))?;
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_index_replaces_previous_link() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("2024-01-01.html");
        let new = dir.path().join("2024-01-08.html");
        std::fs::write(&old, "old week").unwrap();
        std::fs::write(&new, "new week").unwrap();

        link_index(dir.path(), &old).unwrap();
        let index = link_index(dir.path(), &new).unwrap();

        assert_eq!(std::fs::read_to_string(index).unwrap(), "new week");
    }
}
