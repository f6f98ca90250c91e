//! Per-frame loud/silent classification.
//!
//! Each video frame's audio slice is compared against the peak of the whole
//! track. A frame is loud when its own peak, normalized by the global peak,
//! reaches the silent threshold. The start/end keep windows are marked loud
//! unconditionally so intros and outros survive regardless of content.

use tracing::debug;

use jumpcut_models::{AudioBuffer, EditConfig};

use crate::error::{EngineError, EngineResult};

/// One boolean per video frame: `true` = loud.
///
/// The map's length is fixed at `audio_frame_count` once computed and never
/// mutated afterwards; dilation happens on a separate buffer.
pub type LoudnessMap = Vec<bool>;

/// Classify every video frame of `audio` as loud or silent.
pub fn classify_loudness(audio: &AudioBuffer, config: &EditConfig) -> EngineResult<LoudnessMap> {
    config.validate()?;

    if audio.is_empty() {
        return Err(EngineError::invalid_input("zero-length audio"));
    }

    let samples_per_frame = config.samples_per_frame();
    let frame_count = config.audio_frame_count(audio.sample_frames());
    let max_audio_volume = audio.peak();

    let keep_from_start = config.keep_frames_from_start();
    let keep_from_end = config.keep_frames_from_end();
    // First frame index of the forced-loud tail window.
    let content_end = frame_count.saturating_sub(keep_from_end);

    debug!(
        frames = frame_count,
        peak = max_audio_volume,
        threshold = config.silent_threshold,
        keep_from_start,
        keep_from_end,
        "Classifying frame loudness"
    );

    let mut map = vec![false; frame_count as usize];
    for (i, loud) in map.iter_mut().enumerate() {
        let frame = i as u64;
        if frame < keep_from_start || frame >= content_end {
            *loud = true;
            continue;
        }

        // A track with zero peak is all silence; guard the 0/0 ratio.
        if max_audio_volume == 0.0 {
            continue;
        }

        let start = (frame as f64 * samples_per_frame) as usize;
        let end = ((frame + 1) as f64 * samples_per_frame) as usize;
        let chunk_peak = jumpcut_models::audio::peak_amplitude(audio.frame_slice(start, end));
        *loud = (chunk_peak / max_audio_volume) as f64 >= config.silent_threshold;
    }

    Ok(map)
}
