//! Video download using yt-dlp.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Download a video into `dest_dir` and return the downloaded file path.
///
/// The output is merged into an mp4 container so the rest of the pipeline
/// never has to deal with split audio/video downloads.
pub async fn download_video(url: &str, dest_dir: &Path) -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let template = dest_dir.join("%(title)s.%(ext)s");
    info!(url, "Downloading video");

    let output = Command::new("yt-dlp")
        .arg("-f")
        .arg("bestvideo+bestaudio/best")
        .arg("--merge-output-format")
        .arg("mp4")
        .arg("--no-playlist")
        .arg("-o")
        .arg(&template)
        .arg("--print")
        .arg("after_move:filepath")
        .arg("--no-simulate")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::download_failed(format!(
            "yt-dlp exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    // yt-dlp prints the final file path thanks to --print after_move.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let path = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| MediaError::download_failed("yt-dlp reported no output file"))?;

    if !path.exists() {
        return Err(MediaError::download_failed(format!(
            "downloaded file {} does not exist",
            path.display()
        )));
    }

    debug!(path = %path.display(), "Download complete");
    Ok(path)
}
