//! Time-scale modification primitive.
//!
//! The remapper only needs one capability: change the duration of an audio
//! chunk by a speed factor while preserving pitch. That capability sits
//! behind the [`TimeStretch`] trait; the default implementation is a WSOLA
//! (waveform-similarity overlap-add) stretcher, which is self-contained and
//! good enough for speech at the speed factors this tool uses.

use std::f32::consts::PI;

use crate::error::StretchError;

/// Duration-changing, pitch-preserving audio transform.
pub trait TimeStretch: Send + Sync {
    /// Stretch interleaved `samples` by `speed`.
    ///
    /// `speed > 1` shortens the chunk, `speed < 1` lengthens it. The output
    /// holds roughly `input_frames / speed` sample frames with the same
    /// channel layout. A zero-length chunk is an error
    /// ([`StretchError::EmptyInput`]); callers decide whether that skips the
    /// chunk or aborts the run.
    fn stretch(&self, samples: &[f32], channels: usize, speed: f64)
        -> Result<Vec<f32>, StretchError>;
}

/// WSOLA time stretcher.
///
/// Overlap-adds Hann-windowed input segments at a fixed synthesis hop,
/// picking each segment near its ideal analysis position by waveform
/// similarity with the natural continuation of the previous segment.
#[derive(Debug, Clone)]
pub struct Wsola {
    /// Analysis window length in sample frames.
    window: usize,
    /// Maximum deviation from the ideal analysis position, in frames.
    seek: usize,
}

impl Wsola {
    /// Create a stretcher tuned for the given sample rate (25 ms window).
    pub fn new(sample_rate: u32) -> Self {
        let window = ((sample_rate as usize * 25 / 1000).max(64) / 2) * 2;
        Self {
            window,
            seek: window / 4,
        }
    }
}

impl TimeStretch for Wsola {
    fn stretch(
        &self,
        samples: &[f32],
        channels: usize,
        speed: f64,
    ) -> Result<Vec<f32>, StretchError> {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        if frames == 0 {
            return Err(StretchError::EmptyInput);
        }
        if !speed.is_finite() || speed <= 0.0 {
            return Err(StretchError::InvalidSpeed(speed));
        }
        if (speed - 1.0).abs() < 1e-9 {
            return Ok(samples[..frames * channels].to_vec());
        }

        let out_frames = (frames as f64 / speed).round() as usize;
        if out_frames == 0 {
            return Ok(Vec::new());
        }

        let window = self.window.min(frames).max(2);
        let hop = (window / 2).max(1);
        let seek = self.seek.min(hop);
        let hann: Vec<f32> = (0..window)
            .map(|i| {
                let s = (PI * i as f32 / window as f32).sin();
                s * s
            })
            .collect();

        let padded = out_frames + window;
        let mut out = vec![0.0f32; padded * channels];
        let mut weight = vec![0.0f32; padded];

        let mut prev_pos = 0usize;
        let mut synth = 0usize;
        let mut first = true;
        while synth < out_frames {
            let ideal = ((synth as f64 * speed) as usize).min(frames - 1);
            let pos = if first || seek == 0 {
                ideal
            } else {
                best_match(
                    samples,
                    channels,
                    frames,
                    ideal,
                    (prev_pos + hop).min(frames - 1),
                    seek,
                    hop,
                )
            };

            for (i, &win) in hann.iter().enumerate() {
                let src = pos + i;
                if src >= frames {
                    break;
                }
                let dst = synth + i;
                for ch in 0..channels {
                    out[dst * channels + ch] += samples[src * channels + ch] * win;
                }
                weight[dst] += win;
            }

            prev_pos = pos;
            first = false;
            synth += hop;
        }

        for f in 0..out_frames {
            let w = weight[f];
            if w > 1e-6 {
                for ch in 0..channels {
                    out[f * channels + ch] /= w;
                }
            }
        }
        out.truncate(out_frames * channels);
        Ok(out)
    }
}

/// Mono mix of one sample frame.
fn mono(samples: &[f32], channels: usize, frame: usize) -> f32 {
    let base = frame * channels;
    samples[base..base + channels].iter().sum::<f32>() / channels as f32
}

/// Pick the analysis position within `±seek` of `ideal` that best matches
/// the natural continuation of the previous segment.
fn best_match(
    samples: &[f32],
    channels: usize,
    frames: usize,
    ideal: usize,
    natural: usize,
    seek: usize,
    compare: usize,
) -> usize {
    let lo = ideal.saturating_sub(seek);
    let hi = (ideal + seek).min(frames - 1);

    let mut best_pos = ideal;
    let mut best_score = f32::NEG_INFINITY;
    for pos in lo..=hi {
        let len = compare.min(frames - pos).min(frames - natural);
        let mut score = 0.0f32;
        for j in 0..len {
            score += mono(samples, channels, natural + j) * mono(samples, channels, pos + j);
        }
        if score > best_score {
            best_score = score;
            best_pos = pos;
        }
    }
    best_pos
}
