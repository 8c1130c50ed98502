//! Terminal rendering for coursekit results.
//!
//! Extension traits that add colored output to coursekit-core types using
//! owo_colors.

use coursekit_core::download::DownloadReport;
use coursekit_core::resource::ResourceOutcome;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for ResourceOutcome {
    fn render(&self) -> String {
        match self {
            ResourceOutcome::Downloaded { path, .. } => {
                format!("{} {}", "+".green(), path.display().green())
            }
            ResourceOutcome::WouldDownload { path } => {
                format!("{} {}", "~".yellow(), path.display().yellow())
            }
            ResourceOutcome::QueuedVideo { url } => format!("{} {}", "▶".cyan(), url.cyan()),
            ResourceOutcome::Skipped { href, reason } => {
                format!("{} {} {}", "-".dimmed(), href.dimmed(), reason.dimmed())
            }
        }
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

impl Render for DownloadReport {
    fn render(&self) -> String {
        let downloaded = self.downloaded();
        let mut parts = vec![format!("{} {}", downloaded, pluralize("file", downloaded))];

        let videos = self.queued_videos();
        if videos > 0 {
            parts.push(format!("{} {} queued", videos, pluralize("video", videos)));
        }
        let skipped = self.skipped_resources();
        if skipped > 0 {
            parts.push(format!("{skipped} skipped").dimmed().to_string());
        }
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed).red().to_string());
        }
        let events = self.skipped_events();
        if events > 0 {
            parts.push(
                format!("{} {} skipped", events, pluralize("event", events))
                    .dimmed()
                    .to_string(),
            );
        }

        parts.join(", ")
    }
}
