//! Edit-point extraction: margin dilation + run-length segmentation.
//!
//! The loudness map is first widened by the frame margin so a little silent
//! context survives around speech, then compressed into maximal spans that
//! share one classification. Boundaries exist only where the dilated value
//! flips, so adjacent edit points never share `should_keep` and the sequence
//! tiles `[0, frame_count)` exactly.

use tracing::debug;

use jumpcut_models::EditPoint;

use crate::error::{EngineError, EngineResult};
use crate::loudness::LoudnessMap;

/// Dilate `loudness` by `frame_margin` frames on both sides.
///
/// A frame is included when any loud frame lies within the margin window
/// around it. The fractional margin is truncated when the window bounds are
/// computed. A margin of zero is the identity transform.
pub fn dilate(loudness: &[bool], frame_margin: f64) -> Vec<bool> {
    let count = loudness.len();
    let mut included = vec![false; count];
    for i in 0..count {
        let start = (i as f64 - frame_margin).max(0.0) as usize;
        let end = ((i as f64 + 1.0 + frame_margin).min(count as f64)) as usize;
        included[i] = loudness[start..end].iter().any(|&loud| loud);
    }
    included
}

/// Segment a loudness map into the ordered edit-point sequence.
///
/// Maps shorter than two frames carry no edit decision and are rejected as
/// invalid input. A uniform map yields a single edit point spanning the
/// whole timeline.
pub fn extract_edit_points(
    loudness: &LoudnessMap,
    frame_margin: f64,
) -> EngineResult<Vec<EditPoint>> {
    if loudness.len() < 2 {
        return Err(EngineError::invalid_input(format!(
            "loudness map of {} frame(s) is too short to segment",
            loudness.len()
        )));
    }

    let included = dilate(loudness, frame_margin);
    let count = included.len() as u64;

    let mut points = Vec::new();
    let mut span_start = 0u64;
    for i in 1..included.len() {
        if included[i] != included[i - 1] {
            points.push(EditPoint::new(span_start, i as u64, included[i - 1]));
            span_start = i as u64;
        }
    }
    points.push(EditPoint::new(
        span_start,
        count,
        included[included.len() - 1],
    ));

    debug!(
        edit_points = points.len(),
        frames = count,
        frame_margin,
        "Extracted edit points"
    );

    Ok(points)
}
