mod commands;
mod credentials;
mod render;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use coursekit_core::{CourseKitError, Verbosity};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use commands::PortalArgs;

#[derive(Parser)]
#[command(name = "coursekit")]
#[command(about = "Download course materials and build weekly prep digests from a course portal")]
struct Cli {
    /// Log each event and resource as it is processed
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log every request
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download files attached to events on or after a date
    Download {
        #[command(flatten)]
        portal: PortalArgs,

        /// Only events starting at or after this date (e.g. "2024-01-10" or "last monday")
        date: Option<String>,

        /// Report what would be downloaded without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Append youtube-dl commands for linked videos
        #[arg(long)]
        youtube_dl: bool,

        /// Directory downloaded files are saved in
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Build the weekly summary page for the week containing a date
    Summary {
        #[command(flatten)]
        portal: PortalArgs,

        /// Week of interest (defaults to today)
        date: Option<String>,

        /// Also build the previous and following weeks
        #[arg(long)]
        pre_post_week: bool,

        /// Point index.html at the page for the week of interest
        #[arg(long)]
        link_index_html: bool,

        /// URL prefix for the previous/next week links
        #[arg(long)]
        site_base: Option<String>,

        /// Directory the pages are written to
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Only include the first few events of each day
        #[arg(long)]
        test_mode: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.debug);
    init_tracing(verbosity);

    match run(cli, verbosity) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::from(exit_status(&e))
        }
    }
}

fn run(cli: Cli, verbosity: Verbosity) -> Result<()> {
    match cli.command {
        Commands::Download {
            portal,
            date,
            dry_run,
            youtube_dl,
            data_dir,
        } => {
            let mut config = commands::run_config(&portal, verbosity)?;
            config.dry_run = dry_run;
            config.youtube_dl = youtube_dl;
            if let Some(dir) = data_dir {
                config.settings.data_dir = dir;
            }
            commands::download::run(&config, &portal, date.as_deref())
        }
        Commands::Summary {
            portal,
            date,
            pre_post_week,
            link_index_html,
            site_base,
            out_dir,
            test_mode,
        } => {
            let mut config = commands::run_config(&portal, verbosity)?;
            config.test_mode = test_mode;
            if let Some(site_base) = site_base {
                config.settings.site_base = site_base;
            }
            if let Some(dir) = out_dir {
                config.settings.out_dir = dir;
            }
            commands::summary::run(
                &config,
                &portal,
                date.as_deref(),
                commands::summary::Extras {
                    pre_post_week,
                    link_index_html,
                },
            )
        }
    }
}

/// `RUST_LOG` wins over the command-line flags.
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// 2 for a malformed feed, 3 for authentication problems, 1 otherwise.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err
        .chain()
        .find_map(|cause| cause.downcast_ref::<CourseKitError>())
    {
        Some(CourseKitError::IcsParse(_)) => 2,
        Some(CourseKitError::NotAuthenticated(_) | CourseKitError::Credentials(_)) => 3,
        _ => 1,
    }
}
