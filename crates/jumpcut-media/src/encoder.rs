//! Hardware encoder selection.
//!
//! When hardware acceleration is requested, the available H.264 encoders
//! are read from `ffmpeg -encoders` and the best-known one is picked.
//! h264_videotoolbox is deliberately not preferred; it tends to produce
//! blurry output.

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Preference order among detected H.264 encoders.
const PREFERRED_ENCODERS: [&str; 2] = ["h264_nvenc", "libx264"];

/// Pick the H.264 encoder to use, or `None` to let FFmpeg decide.
///
/// Returns `None` when hardware acceleration is disabled or no H.264
/// encoder is detected.
pub async fn select_h264_encoder(use_hardware_acc: bool) -> MediaResult<Option<String>> {
    if !use_hardware_acc {
        return Ok(None);
    }

    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await?;

    let listing = String::from_utf8_lossy(&output.stdout);
    let candidates = parse_h264_encoders(&listing);
    debug!(?candidates, "Detected H.264 encoders");

    let selected = pick_encoder(&candidates);
    if let Some(encoder) = &selected {
        info!(encoder, "Selected video encoder");
    }
    Ok(selected)
}

/// Extract H.264 video encoder names from `ffmpeg -encoders` output.
fn parse_h264_encoders(listing: &str) -> Vec<String> {
    listing
        .lines()
        .skip_while(|line| line.trim() != "------")
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            if flags.starts_with('V') && name.contains("264") {
                Some(name.to_string())
            } else {
                None
            }
        })
        .collect()
}

fn pick_encoder(candidates: &[String]) -> Option<String> {
    for preferred in PREFERRED_ENCODERS {
        if candidates.iter().any(|c| c == preferred) {
            return Some(preferred.to_string());
        }
    }
    candidates.first().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder
 V....D libx265              libx265 H.265 / HEVC
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn test_parse_h264_encoders() {
        assert_eq!(parse_h264_encoders(LISTING), vec!["libx264", "h264_nvenc"]);
    }

    #[test]
    fn test_header_legend_is_not_an_encoder() {
        // The legend above the separator mentions "V....." too.
        let parsed = parse_h264_encoders("Encoders:\n V..... = Video\n ------\n");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_nvenc_preferred_over_software() {
        let candidates = vec!["libx264".to_string(), "h264_nvenc".to_string()];
        assert_eq!(pick_encoder(&candidates), Some("h264_nvenc".to_string()));
    }

    #[test]
    fn test_falls_back_to_first_detected() {
        let candidates = vec!["h264_v4l2m2m".to_string()];
        assert_eq!(pick_encoder(&candidates), Some("h264_v4l2m2m".to_string()));
        assert_eq!(pick_encoder(&[]), None);
    }
}
