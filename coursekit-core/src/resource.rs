//! Turning a scraped resource link into a file on disk.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{CourseKitError, CourseKitResult};
use crate::portal::Fetch;
use crate::scrape::{ResourceLink, ScrapedEventPage};

/// Longest target filename, in characters.
pub const MAX_FILENAME_CHARS: usize = 250;

const AUDIO_EXTENSIONS: [&str; 2] = [".mp3", ".m4a"];
const VIDEO_HOSTS: [&str; 3] = ["youtube.com", "youtu.be", "vimeo.com"];

/// Build the name a resource is saved under.
///
/// Deterministic in its inputs: the same scraped metadata always yields the
/// same name, which is what makes re-runs skip files already present.
pub fn target_filename(
    course_code: &str,
    formatted_date: &str,
    class_title: &str,
    file_kind: &str,
    source_filename: &str,
) -> String {
    [course_code, formatted_date, class_title, file_kind, source_filename]
        .join(" - ")
        .replace('/', "_")
        .replace(['\n', '\r'], "")
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// The numeric file id in a resource href's query string.
pub fn file_id(href: &str) -> Option<String> {
    let base = Url::parse("http://portal.invalid/").ok()?;
    let url = base.join(href).ok()?;
    url.query_pairs()
        .map(|(_, value)| value)
        .find(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()))
        .map(|value| value.into_owned())
}

/// The filename carried by a Content-Disposition header.
///
/// The RFC 5987 `filename*=charset''value` form wins over plain `filename=`.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let params = disposition_params(header);

    let extended = params
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("filename*"))
        .and_then(|(_, value)| {
            // charset'language'percent-encoded-name
            let encoded = value.splitn(3, '\'').nth(2)?;
            Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned())
        });

    extended
        .or_else(|| {
            params
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("filename"))
                .map(|(_, value)| value.clone())
        })
        .filter(|name| !name.is_empty())
}

/// `name=value` parameters after the disposition type, quotes removed.
/// Semicolons inside a quoted value do not split it.
fn disposition_params(header: &str) -> Vec<(String, String)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in header.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ';' if !quoted => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);

    parts
        .iter()
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.trim().to_string(), value.to_string()))
        })
        .collect()
}

pub fn is_audio(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    AUDIO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn is_external_video(href: &str) -> bool {
    Url::parse(href)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
        .is_some_and(|host| {
            VIDEO_HOSTS
                .iter()
                .any(|h| host == *h || host.ends_with(&format!(".{h}")))
        })
}

/// Why a resource link did not produce a file. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSkip {
    /// Label missing or without a KB/MB size.
    NoFileSize,
    NoFileId,
    NoContentDisposition,
    Audio(String),
    Exists(PathBuf),
}

impl std::fmt::Display for ResourceSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceSkip::NoFileSize => write!(f, "No file size"),
            ResourceSkip::NoFileId => write!(f, "No file id"),
            ResourceSkip::NoContentDisposition => write!(f, "No content disposition"),
            ResourceSkip::Audio(name) => write!(f, "Audio file {name}"),
            ResourceSkip::Exists(_) => write!(f, "File exists"),
        }
    }
}

/// What happened to one resource link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    WouldDownload { path: PathBuf },
    QueuedVideo { url: String },
    Skipped { href: String, reason: ResourceSkip },
}

/// Download settings for one run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub data_dir: PathBuf,
    /// `{id}` is replaced by the resource's file id.
    pub file_url_template: String,
    pub dry_run: bool,
    /// Append youtube-dl commands for video links to this file.
    pub youtube_dl_file: Option<PathBuf>,
}

impl DownloadOptions {
    pub fn download_url(&self, file_id: &str) -> String {
        self.file_url_template.replace("{id}", file_id)
    }
}

/// Resolves and writes the resources of scraped pages through one session.
pub struct ResourceResolver<'a, F: Fetch + ?Sized> {
    fetch: &'a F,
    options: &'a DownloadOptions,
}

impl<'a, F: Fetch + ?Sized> ResourceResolver<'a, F> {
    pub fn new(fetch: &'a F, options: &'a DownloadOptions) -> Self {
        ResourceResolver { fetch, options }
    }

    /// Resolve a single link. Writes zero or one file and never overwrites.
    pub fn resolve(
        &self,
        page: &ScrapedEventPage,
        link: &ResourceLink,
    ) -> CourseKitResult<ResourceOutcome> {
        let skip = |reason| ResourceOutcome::Skipped {
            href: link.href.clone(),
            reason,
        };

        if let Some(commands) = &self.options.youtube_dl_file
            && is_external_video(&link.href)
        {
            return self.queue_video(page, link, commands);
        }

        let Some(file_kind) = link.inferred_kind.as_deref() else {
            return Ok(skip(ResourceSkip::NoFileSize));
        };
        let Some(id) = file_id(&link.href) else {
            return Ok(skip(ResourceSkip::NoFileId));
        };

        let response = self.fetch.get(&self.options.download_url(&id))?;

        let Some(source_filename) = response
            .content_disposition
            .as_deref()
            .and_then(content_disposition_filename)
        else {
            return Ok(skip(ResourceSkip::NoContentDisposition));
        };

        let name = target_filename(
            &page.course_code,
            &page.formatted_date,
            &page.class_title,
            file_kind,
            &source_filename,
        );
        if is_audio(&name) {
            return Ok(skip(ResourceSkip::Audio(name)));
        }

        let path = self.options.data_dir.join(&name);
        if path.exists() {
            return Ok(skip(ResourceSkip::Exists(path)));
        }

        if self.options.dry_run {
            return Ok(ResourceOutcome::WouldDownload { path });
        }

        std::fs::create_dir_all(&self.options.data_dir)?;
        let bytes = write_new_file(&path, |file| response.copy_to(file))?;

        Ok(ResourceOutcome::Downloaded { path, bytes })
    }

    fn queue_video(
        &self,
        page: &ScrapedEventPage,
        link: &ResourceLink,
        commands: &Path,
    ) -> CourseKitResult<ResourceOutcome> {
        let kind = link
            .inferred_kind
            .clone()
            .or_else(|| link.display_label.clone())
            .unwrap_or_else(|| "Video".to_string());
        let name = target_filename(
            &page.course_code,
            &page.formatted_date,
            &page.class_title,
            &kind,
            "%(title)s.%(ext)s",
        );
        let output = self.options.data_dir.join(name);
        let command = format!(
            "youtube-dl -o {} {}",
            shell_quote(&output.to_string_lossy()),
            shell_quote(&link.href)
        );

        if !self.options.dry_run {
            append_command(commands, &command)?;
        }

        Ok(ResourceOutcome::QueuedVideo {
            url: link.href.clone(),
        })
    }
}

/// Create `path` (failing if it exists) and fill it; a partial file is
/// removed if filling fails.
fn write_new_file(
    path: &Path,
    fill: impl FnOnce(&mut std::fs::File) -> CourseKitResult<u64>,
) -> CourseKitResult<u64> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

    match fill(&mut file).and_then(|bytes| {
        file.flush()?;
        Ok(bytes)
    }) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            drop(file);
            let _ = std::fs::remove_file(path);
            Err(e)
        }
    }
}

/// Append a command line unless an identical line is already there.
fn append_command(commands: &Path, command: &str) -> CourseKitResult<()> {
    let existing = match std::fs::read_to_string(commands) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(CourseKitError::Io(e)),
    };
    if existing.lines().any(|line| line == command) {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(commands)?;
    writeln!(file, "{command}")?;
    Ok(())
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
