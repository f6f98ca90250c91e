//! In-memory audio representation.
//!
//! Audio reaches the engine as raw f32 PCM extracted by ffmpeg
//! (`-f f32le`), interleaved across channels at a fixed sample rate. The
//! buffer is owned by the caller for the whole run and read-only to the
//! engine except for the chunk currently being time-remapped.

/// Interleaved multi-channel f32 audio at a fixed sample rate.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap interleaved samples. `channels` must be at least 1; trailing
    /// samples that do not fill a whole frame are dropped.
    pub fn new(mut samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let whole = (samples.len() / channels) * channels;
        samples.truncate(whole);
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (one frame = one sample per channel).
    pub fn sample_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Whether the buffer holds no audio at all.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Interleaved samples covering `[start, end)` in sample frames, with
    /// both bounds clamped to the buffer.
    pub fn frame_slice(&self, start: usize, end: usize) -> &[f32] {
        let frames = self.sample_frames();
        let start = start.min(frames);
        let end = end.clamp(start, frames);
        &self.samples[start * self.channels..end * self.channels]
    }

    /// Peak amplitude over the whole buffer: `max(|max|, |min|)`, measured
    /// across all channels together. Returns 0 for an empty buffer.
    pub fn peak(&self) -> f32 {
        peak_amplitude(&self.samples)
    }
}

/// Peak measure used for loudness comparisons: `max(max(s), -min(s))`.
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    let mut max = 0.0f32;
    let mut min = 0.0f32;
    for &s in samples {
        if s > max {
            max = s;
        }
        if s < min {
            min = s;
        }
    }
    max.max(-min)
}
