//! Chapter/section bookkeeping under cuts.
//!
//! Sections are parsed once from a chapter list before editing begins.
//! While edit points stream through in timeline order, each section
//! accumulates the frame count removed before or inside its span as a
//! negative offset; finalization applies the offsets, re-sorts, and chains
//! the end frames.

use tracing::debug;

use jumpcut_models::timecode::parse_chapter_timecode;
use jumpcut_models::EditPoint;

use crate::error::SectionParseError;

/// A named sub-range of the timeline whose boundaries must survive edits.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Start frame, on the source timeline until finalization adjusts it.
    pub start_frame: i64,
    /// End frame; set during finalization from the next section's start.
    pub end_frame: i64,
    /// Chapter title.
    pub title: String,
    /// Accumulated frame count removed before this section's start.
    edit_offset: i64,
}

impl Section {
    /// Create a section starting at `start_frame` on the source timeline.
    pub fn new(start_frame: u64, title: impl Into<String>) -> Self {
        Self {
            start_frame: start_frame as i64,
            end_frame: -1,
            title: title.into(),
            edit_offset: 0,
        }
    }

    /// Length of the section on the finalized timeline.
    pub fn frame_count(&self) -> i64 {
        self.end_frame - self.start_frame
    }
}

/// Parse a chapter list: one `<timecode> <title>` pair per line.
///
/// Blank lines are ignored; a line without a title or with a malformed
/// timecode is an error.
pub fn parse_sections(text: &str, frame_rate: f64) -> Result<Vec<Section>, SectionParseError> {
    let mut sections = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (timecode, title) = line
            .split_once(char::is_whitespace)
            .ok_or(SectionParseError::MissingTitle { line: i + 1 })?;
        let title = title.trim();
        if title.is_empty() {
            return Err(SectionParseError::MissingTitle { line: i + 1 });
        }
        let start_frame = parse_chapter_timecode(timecode, frame_rate)
            .map_err(|source| SectionParseError::BadTimecode { line: i + 1, source })?;
        sections.push(Section::new(start_frame, title));
    }
    Ok(sections)
}

/// Tracks chapter boundaries while edit points stream through.
#[derive(Debug, Default)]
pub struct SectionTracker {
    sections: Vec<Section>,
}

impl SectionTracker {
    /// Create a tracker over the parsed sections.
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Whether any sections are being tracked.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Observe one delivered edit point.
    ///
    /// Offsets accumulate only for points whose output span collapses to at
    /// most one frame, i.e. points the cut list treats as fully removed.
    /// This deliberately mirrors the source policy of keying on the output
    /// span rather than on `should_keep`.
    pub fn observe(
        &mut self,
        point: &EditPoint,
        output_start_frame: u64,
        output_end_frame: u64,
    ) {
        if output_end_frame.saturating_sub(output_start_frame) > 1 {
            return;
        }
        for section in &mut self.sections {
            let start = point.start_frame as i64;
            let end = point.end_frame as i64;
            if end < section.start_frame {
                // Whole removed span predates the chapter.
                section.edit_offset -= end - start;
            } else if start < section.start_frame {
                // Straddling span: only the part before the chapter counts.
                section.edit_offset -= section.start_frame - start;
            }
        }
    }

    /// Apply the accumulated offsets and chain section boundaries.
    ///
    /// Sections are sorted by adjusted start; each ends where the next
    /// begins, and the last one ends at the total output frame count (+1 to
    /// include the final frame).
    pub fn finalize(mut self, total_output_frames: u64) -> Vec<Section> {
        if self.sections.is_empty() {
            return self.sections;
        }

        for section in &mut self.sections {
            section.start_frame += section.edit_offset;
            section.edit_offset = 0;
        }
        self.sections.sort_by_key(|s| s.start_frame);

        for i in 1..self.sections.len() {
            self.sections[i - 1].end_frame = self.sections[i].start_frame;
        }
        if let Some(last) = self.sections.last_mut() {
            last.end_frame = total_output_frames as i64 + 1;
        }

        debug!(sections = self.sections.len(), "Finalized section boundaries");
        self.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let text = "0:12 Intro\n1:30 Main part\n\n12:00 Outro\n";
        let sections = parse_sections(text, 30.0).unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].start_frame, 360);
        assert_eq!(sections[0].title, "Intro");
        assert_eq!(sections[1].start_frame, 2700);
        assert_eq!(sections[1].title, "Main part");
        assert_eq!(sections[2].start_frame, 21600);
    }

    #[test]
    fn test_parse_rejects_missing_title() {
        assert_eq!(
            parse_sections("0:12\n", 30.0),
            Err(SectionParseError::MissingTitle { line: 1 })
        );
    }

    #[test]
    fn test_parse_rejects_bad_timecode() {
        assert!(matches!(
            parse_sections("1:2:3:4 Broken\n", 30.0),
            Err(SectionParseError::BadTimecode { line: 1, .. })
        ));
    }

    #[test]
    fn test_drop_before_section_shifts_start() {
        let mut tracker = SectionTracker::new(vec![Section::new(100, "ch")]);
        // A 20-frame span collapsed to nothing, entirely before frame 100.
        tracker.observe(&EditPoint::new(50, 70, false), 10, 10);
        let sections = tracker.finalize(200);
        assert_eq!(sections[0].start_frame, 80);
    }

    #[test]
    fn test_straddling_drop_counts_leading_part_only() {
        let mut tracker = SectionTracker::new(vec![Section::new(100, "ch")]);
        tracker.observe(&EditPoint::new(90, 120, false), 10, 10);
        let sections = tracker.finalize(200);
        assert_eq!(sections[0].start_frame, 90);
    }

    #[test]
    fn test_kept_spans_do_not_shift() {
        let mut tracker = SectionTracker::new(vec![Section::new(100, "ch")]);
        // Output span wider than one frame: nothing was removed.
        tracker.observe(&EditPoint::new(0, 100, true), 0, 100);
        let sections = tracker.finalize(200);
        assert_eq!(sections[0].start_frame, 100);
    }

    #[test]
    fn test_drop_after_section_has_no_effect() {
        let mut tracker = SectionTracker::new(vec![Section::new(100, "ch")]);
        tracker.observe(&EditPoint::new(150, 170, false), 10, 10);
        let sections = tracker.finalize(200);
        assert_eq!(sections[0].start_frame, 100);
    }

    #[test]
    fn test_finalize_sorts_and_chains_ends() {
        let mut tracker = SectionTracker::new(vec![
            Section::new(500, "late"),
            Section::new(100, "early"),
        ]);
        // Collapse 300 frames ahead of the late section only.
        tracker.observe(&EditPoint::new(200, 480, false), 10, 10);
        let sections = tracker.finalize(400);
        assert_eq!(sections[0].title, "early");
        assert_eq!(sections[0].start_frame, 100);
        assert_eq!(sections[0].end_frame, 220);
        assert_eq!(sections[1].title, "late");
        assert_eq!(sections[1].start_frame, 220);
        assert_eq!(sections[1].end_frame, 401);
    }
}
