//! FFmpeg, ffprobe, and yt-dlp integration for the jumpcut editor.
//!
//! This crate owns everything that touches external tools or the
//! filesystem: probing inputs, extracting audio, discovering chapters,
//! downloading remote videos, and the video/audio output sinks that turn
//! the engine's edit events into files.

pub mod audio;
pub mod audio_out;
pub mod chapters;
pub mod command;
pub mod download;
pub mod encoder;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod render;

pub use audio::{extract_audio, load_wav};
pub use audio_out::AudioSink;
pub use chapters::{probe_chapters, resolve_sections_file, Chapter};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::download_video;
pub use encoder::select_h264_encoder;
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use render::{CutVideoSink, RenderOptions};
