//! Chapter discovery for section-aware edits.
//!
//! A sections file holds one `<timecode> <title>` line per chapter. When the
//! user supplies none, two fallbacks apply in order: a `.sec` sidecar next
//! to the input, then chapter metadata embedded in the container (probed via
//! ffprobe and cached into the sidecar for subsequent runs).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// One embedded chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    /// Start time in seconds.
    pub start_secs: f64,
    /// End time in seconds.
    pub end_secs: f64,
    /// Chapter title.
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct FfprobeChapters {
    #[serde(default)]
    chapters: Vec<FfprobeChapter>,
}

#[derive(Debug, Deserialize)]
struct FfprobeChapter {
    start_time: String,
    end_time: String,
    #[serde(default)]
    tags: ChapterTags,
}

#[derive(Debug, Default, Deserialize)]
struct ChapterTags {
    title: Option<String>,
}

/// Read chapter metadata embedded in the container.
pub async fn probe_chapters(path: impl AsRef<Path>) -> MediaResult<Vec<Chapter>> {
    let path = path.as_ref();
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args(["-print_format", "json", "-show_chapters", "-loglevel", "fatal"])
        .arg("-i")
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe chapter query failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let parsed: FfprobeChapters = serde_json::from_slice(&output.stdout)?;
    Ok(parsed
        .chapters
        .into_iter()
        .map(|c| Chapter {
            start_secs: c.start_time.parse().unwrap_or(0.0),
            end_secs: c.end_time.parse().unwrap_or(0.0),
            title: c.tags.title.unwrap_or_default(),
        })
        .collect())
}

/// Sidecar path for `input`: same stem, `.sec` extension.
pub fn sidecar_path(input: &Path) -> PathBuf {
    input.with_extension("sec")
}

/// Render chapters in the sections-file line format.
fn format_sections(chapters: &[Chapter]) -> String {
    let mut text = String::new();
    for chapter in chapters {
        let start = chapter.start_secs as u64;
        let end = chapter.end_secs as u64;
        text.push_str(&format!(
            "{}:{:02} {}:{:02} {}\n",
            start / 60,
            start % 60,
            end / 60,
            end % 60,
            chapter.title,
        ));
    }
    text
}

/// Resolve the sections file for an input.
///
/// Precedence: explicit path, existing `.sec` sidecar, embedded chapter
/// metadata (written to the sidecar). Returns `None` when no source yields
/// any sections.
pub async fn resolve_sections_file(
    input: &Path,
    explicit: Option<&Path>,
) -> MediaResult<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let sidecar = sidecar_path(input);
    if sidecar.exists() {
        info!(path = %sidecar.display(), "Using sections sidecar");
        return Ok(Some(sidecar));
    }

    let chapters = probe_chapters(input).await?;
    if chapters.is_empty() {
        debug!(input = %input.display(), "No embedded chapters");
        return Ok(None);
    }

    tokio::fs::write(&sidecar, format_sections(&chapters)).await?;
    info!(
        path = %sidecar.display(),
        chapters = chapters.len(),
        "Wrote sections sidecar from embedded chapters"
    );
    Ok(Some(sidecar))
}
