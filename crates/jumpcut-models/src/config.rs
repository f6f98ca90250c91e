//! Editing configuration.
//!
//! One immutable settings bundle is built up front and passed by reference
//! into every pipeline component. Defaults match the tool's CLI defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::edit_point::SpeedTable;

/// Configuration error raised for out-of-range parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("silent threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("playback speeds must be positive, got silent={silent} sounded={sounded}")]
    NonPositiveSpeed { silent: f64, sounded: f64 },

    #[error("frame margin must not be negative, got {0}")]
    NegativeMargin(f64),

    #[error("frame rate must be positive, got {0}")]
    NonPositiveFrameRate(f64),

    #[error("sample rate must be positive")]
    ZeroSampleRate,
}

/// Settings for one editing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditConfig {
    /// Volume ratio a frame's audio needs to reach, relative to the peak of
    /// the whole track, to count as "sounded" (0.0-1.0).
    pub silent_threshold: f64,

    /// Playback speeds for silent and sounded spans.
    pub speeds: SpeedTable,

    /// Silent frames kept on either side of sounded content, as context.
    /// May be fractional; truncated when the dilation window is computed.
    pub frame_margin: f64,

    /// Audio sample rate the input is resampled to (Hz).
    pub sample_rate: u32,

    /// Video frame rate. Overridden by stream probing when detection
    /// succeeds.
    pub frame_rate: f64,

    /// Seconds at the start of the input that are kept regardless of
    /// loudness.
    pub keep_start_secs: f64,

    /// Seconds at the end of the input that are kept regardless of
    /// loudness.
    pub keep_end_secs: f64,

    /// Length of the linear fade applied at both ends of every remapped
    /// chunk, in sample frames. Chunks shorter than this are muted
    /// entirely instead of producing an audible click.
    pub fade_envelope_size: usize,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            silent_threshold: 0.03,
            speeds: SpeedTable::default(),
            frame_margin: 1.0,
            sample_rate: 44100,
            frame_rate: 30.0,
            keep_start_secs: 0.0,
            keep_end_secs: 0.0,
            fade_envelope_size: 400,
        }
    }
}

impl EditConfig {
    /// Check every parameter is inside its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.silent_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.silent_threshold));
        }
        if self.speeds.silent <= 0.0 || self.speeds.sounded <= 0.0 {
            return Err(ConfigError::NonPositiveSpeed {
                silent: self.speeds.silent,
                sounded: self.speeds.sounded,
            });
        }
        if self.frame_margin < 0.0 {
            return Err(ConfigError::NegativeMargin(self.frame_margin));
        }
        if self.frame_rate <= 0.0 {
            return Err(ConfigError::NonPositiveFrameRate(self.frame_rate));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        Ok(())
    }

    /// Audio sample frames backing one video frame. Real-valued; frame
    /// boundaries in the sample domain are truncated from
    /// `frame * samples_per_frame`.
    pub fn samples_per_frame(&self) -> f64 {
        self.sample_rate as f64 / self.frame_rate
    }

    /// Video frames needed to cover `sample_frames` of audio.
    pub fn audio_frame_count(&self, sample_frames: usize) -> u64 {
        (sample_frames as f64 / self.samples_per_frame()).ceil() as u64
    }

    /// Frames forced loud at the start of the timeline.
    pub fn keep_frames_from_start(&self) -> u64 {
        (self.frame_rate * self.keep_start_secs) as u64
    }

    /// Frames forced loud at the end of the timeline.
    pub fn keep_frames_from_end(&self) -> u64 {
        (self.frame_rate * self.keep_end_secs) as u64
    }

    /// Builder-style setter for the silent threshold, clamped to [0, 1].
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.silent_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the speed table.
    pub fn with_speeds(mut self, silent: f64, sounded: f64) -> Self {
        self.speeds = SpeedTable::new(silent, sounded);
        self
    }

    /// Builder-style setter for the frame margin.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.frame_margin = margin.max(0.0);
        self
    }

    /// Builder-style setter for the frame rate.
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Builder-style setter for the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}
