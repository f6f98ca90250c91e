//! Per-edit-point time remapping and output frame accounting.
//!
//! Each edit point's audio slice is run through the time-scale primitive at
//! the speed its classification selects, faded at both ends, and placed on
//! the output timeline by a running sample cursor. The cursor is the
//! authoritative output clock: it never resets or skips across edit points,
//! and both of its ends convert to output frame indices with `ceil`.

use tracing::debug;

use jumpcut_models::{EditConfig, EditPoint};

use crate::error::StretchError;
use crate::stretch::TimeStretch;

/// One remapped chunk, ready for sink delivery.
#[derive(Debug, Clone)]
pub struct RemappedChunk {
    /// Time-stretched, faded interleaved audio.
    pub samples: Vec<f32>,
    /// First output frame covered by this chunk.
    pub output_start_frame: u64,
    /// Frame one past the chunk's end on the output timeline.
    pub output_end_frame: u64,
}

/// Applies per-point speed, fades, and output accounting in timeline order.
pub struct TimeRemapper<'a> {
    speeds: jumpcut_models::SpeedTable,
    samples_per_frame: f64,
    fade_envelope_size: usize,
    channels: usize,
    stretcher: &'a dyn TimeStretch,
    /// Running output clock, in sample frames.
    cursor: u64,
}

impl<'a> TimeRemapper<'a> {
    /// Create a remapper for one run.
    pub fn new(config: &EditConfig, channels: usize, stretcher: &'a dyn TimeStretch) -> Self {
        Self {
            speeds: config.speeds,
            samples_per_frame: config.samples_per_frame(),
            fade_envelope_size: config.fade_envelope_size,
            channels: channels.max(1),
            stretcher,
            cursor: 0,
        }
    }

    /// Current position of the output clock, in sample frames.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Remap one edit point's raw audio slice.
    ///
    /// Returns `Ok(None)` when the slice is degenerate (zero-length) and the
    /// time-scale primitive cannot process it; the point is skipped rather
    /// than aborting the run.
    pub fn remap(
        &mut self,
        point: &EditPoint,
        slice: &[f32],
    ) -> Result<Option<RemappedChunk>, StretchError> {
        let speed = self.speeds.speed_for(point.should_keep);
        let mut altered = match self.stretcher.stretch(slice, self.channels, speed) {
            Ok(samples) => samples,
            Err(StretchError::EmptyInput) => {
                debug!(
                    start_frame = point.start_frame,
                    end_frame = point.end_frame,
                    "Skipping edit point with empty audio slice"
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let altered_frames = (altered.len() / self.channels) as u64;
        self.apply_fade(&mut altered);

        let start = self.cursor;
        let end = start + altered_frames;
        self.cursor = end;

        Ok(Some(RemappedChunk {
            samples: altered,
            output_start_frame: self.to_output_frame(start),
            output_end_frame: self.to_output_frame(end),
        }))
    }

    /// Convert a sample-frame offset on the output clock to a video frame.
    fn to_output_frame(&self, sample_frame: u64) -> u64 {
        (sample_frame as f64 / self.samples_per_frame).ceil() as u64
    }

    /// Fade the chunk in and out, or mute it entirely when it is too short
    /// to fade without an audible click.
    fn apply_fade(&self, samples: &mut [f32]) {
        let envelope = self.fade_envelope_size;
        let frames = samples.len() / self.channels;

        if frames < envelope {
            samples.fill(0.0);
            return;
        }

        for j in 0..envelope {
            let gain_in = j as f32 / envelope as f32;
            let gain_out = 1.0 - gain_in;
            for ch in 0..self.channels {
                samples[j * self.channels + ch] *= gain_in;
                samples[(frames - envelope + j) * self.channels + ch] *= gain_out;
            }
        }
    }
}
