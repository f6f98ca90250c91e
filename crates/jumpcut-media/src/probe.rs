//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use jumpcut_models::timecode::duration_to_frames;

use crate::error::{MediaError, MediaResult};

/// Properties of an input file relevant to the edit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels (0 for audio-only inputs)
    pub width: u32,
    /// Height in pixels (0 for audio-only inputs)
    pub height: u32,
    /// Frame rate (fps); `None` when no video stream is present
    pub fps: Option<f64>,
    /// Whether the file carries a video stream
    pub has_video: bool,
}

impl MediaInfo {
    /// Total video frames at the probed frame rate.
    pub fn video_frame_count(&self) -> u64 {
        match self.fps {
            Some(fps) => duration_to_frames(self.duration, fps),
            None => 0,
        }
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe an input file for the properties the edit run depends on.
///
/// Audio-only inputs are valid; they simply report no video stream and no
/// frame rate.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    let info = media_info_from_probe(probe)?;
    debug!(path = %path.display(), ?info, "Probed input");
    Ok(info)
}

/// Map raw ffprobe output onto [`MediaInfo`].
fn media_info_from_probe(probe: FfprobeOutput) -> MediaResult<MediaInfo> {
    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");
    if video_stream.is_none() && !probe.streams.iter().any(|s| s.codec_type == "audio") {
        return Err(MediaError::InvalidMedia(
            "no audio or video stream found".to_string(),
        ));
    }

    let fps = video_stream.and_then(|s| {
        s.avg_frame_rate
            .as_ref()
            .or(s.r_frame_rate.as_ref())
            .and_then(|r| parse_frame_rate(r))
    });

    Ok(MediaInfo {
        duration,
        width: video_stream.and_then(|s| s.width).unwrap_or(0),
        height: video_stream.and_then(|s| s.height).unwrap_or(0),
        fps,
        has_video: video_stream.is_some(),
    })
}

/// Parse a frame rate string (e.g. "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|&f| f > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);
    }

    #[test]
    fn test_probe_output_with_video_stream() {
        let json = r#"{
            "format": { "duration": "10.500000", "size": "1234" },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "avg_frame_rate": "30000/1001"
                },
                { "codec_type": "audio", "codec_name": "aac" }
            ]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        let info = media_info_from_probe(probe).unwrap();
        assert!(info.has_video);
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration - 10.5).abs() < f64::EPSILON);
        assert!((info.fps.unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_probe_output_falls_back_to_r_frame_rate() {
        let json = r#"{
            "format": { "duration": "1.0" },
            "streams": [
                { "codec_type": "video", "width": 640, "height": 480, "r_frame_rate": "25/1" }
            ]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        let info = media_info_from_probe(probe).unwrap();
        assert_eq!(info.fps, Some(25.0));
    }

    #[test]
    fn test_probe_output_audio_only() {
        let json = r#"{
            "format": { "duration": "300.0" },
            "streams": [ { "codec_type": "audio", "codec_name": "mp3" } ]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        let info = media_info_from_probe(probe).unwrap();
        assert!(!info.has_video);
        assert_eq!(info.fps, None);
        assert_eq!(info.width, 0);
        assert_eq!(info.video_frame_count(), 0);
    }

    #[test]
    fn test_probe_output_without_streams_is_invalid() {
        let json = r#"{ "format": {}, "streams": [] }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert!(matches!(
            media_info_from_probe(probe),
            Err(MediaError::InvalidMedia(_))
        ));
    }

    #[test]
    fn test_video_frame_count() {
        let info = MediaInfo {
            duration: 10.0,
            width: 1920,
            height: 1080,
            fps: Some(30.0),
            has_video: true,
        };
        assert_eq!(info.video_frame_count(), 300);

        let audio_only = MediaInfo {
            duration: 10.0,
            width: 0,
            height: 0,
            fps: None,
            has_video: false,
        };
        assert_eq!(audio_only.video_frame_count(), 0);
    }
}
