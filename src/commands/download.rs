use anyhow::{Context, Result};
use coursekit_core::RunConfig;
use coursekit_core::download::{EventOutcome, download_resources};
use coursekit_core::resource::ResourceOutcome;
use coursekit_core::scrape::MedtechExtractor;
use owo_colors::OwoColorize;

use super::{PortalArgs, connect, parse_date};
use crate::render::Render;

pub fn run(config: &RunConfig, args: &PortalArgs, date: Option<&str>) -> Result<()> {
    let from = date.map(parse_date).transpose()?;
    if let Some(from) = from {
        tracing::info!(%from, "Downloading events on or after");
    }

    let portal = connect(config, args)?;
    let extractor = MedtechExtractor::new(config.settings.audience.clone());
    let options = config.download_options();

    if options.dry_run {
        println!("{}", "Dry run: nothing will be written".yellow());
    }

    let report = download_resources(&portal.feed, from, &portal.session, &extractor, &options)
        .context("Download aborted")?;

    for outcome in &report.events {
        let EventOutcome::Scraped { event, resources } = outcome else {
            continue;
        };
        let shown: Vec<&ResourceOutcome> = resources
            .iter()
            .filter(|r| !matches!(r, ResourceOutcome::Skipped { .. }) || config.verbosity.is_verbose())
            .collect();
        if shown.is_empty() {
            continue;
        }

        println!("{}", event.to_string().bold());
        for resource in shown {
            println!("   {}", resource.render());
        }
    }

    println!("\n{}", report.render());
    Ok(())
}
