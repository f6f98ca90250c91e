//! Edit points and playback speed selection.
//!
//! An edit point is a maximal span of video frames sharing one keep/drop
//! classification. The extractor produces them contiguous, monotonic and
//! alternating: point *i* ends where point *i+1* starts, the first starts at
//! frame 0, the last ends at the audio frame count, and no two neighbours
//! share `should_keep`.

use serde::{Deserialize, Serialize};

/// A timeline span with a single loud/silent classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPoint {
    /// First video frame of the span (inclusive).
    pub start_frame: u64,
    /// Frame one past the end of the span (exclusive).
    pub end_frame: u64,
    /// Whether the span holds sounded content and should be kept at the
    /// sounded speed.
    pub should_keep: bool,
}

impl EditPoint {
    /// Create a new edit point.
    pub fn new(start_frame: u64, end_frame: u64, should_keep: bool) -> Self {
        Self {
            start_frame,
            end_frame,
            should_keep,
        }
    }

    /// Number of source frames covered by this span.
    pub fn span_frames(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame)
    }
}

/// Playback speeds keyed by the keep/drop classification.
///
/// Very large silent speeds (e.g. `9999.0`) are valid and collapse silent
/// spans to effectively nothing, which is what produces the jump-cut style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedTable {
    /// Speed applied to silent spans.
    pub silent: f64,
    /// Speed applied to sounded spans. Typically 1.
    pub sounded: f64,
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self {
            silent: 5.0,
            sounded: 1.0,
        }
    }
}

impl SpeedTable {
    /// Create a speed table from explicit silent/sounded speeds.
    pub fn new(silent: f64, sounded: f64) -> Self {
        Self { silent, sounded }
    }

    /// Speed factor for a span with the given classification.
    pub fn speed_for(&self, should_keep: bool) -> f64 {
        if should_keep {
            self.sounded
        } else {
            self.silent
        }
    }
}
