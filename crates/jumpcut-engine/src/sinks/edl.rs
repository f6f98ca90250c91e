//! Edit Decision List sink.
//!
//! Renders the edit events into a CMX-style EDL that editing software can
//! import non-destructively. Silent spans that were slowed rather than cut
//! get an `M2` motion-effect line; spans whose output collapses to a single
//! frame are omitted entirely.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use jumpcut_models::timecode::format_frame_timecode;
use jumpcut_models::EditPoint;

use crate::error::SinkError;
use crate::sinks::{EditSink, MappingLog};

/// Accumulates EDL text and writes it at close.
pub struct EdlSink {
    frame_rate: f64,
    clip_name: String,
    output_path: PathBuf,
    body: String,
    index: usize,
    mapping: MappingLog,
}

impl EdlSink {
    /// Create an EDL sink for `input`.
    ///
    /// Without an explicit `output_path` the list is written next to the
    /// input as `<stem>.edl`.
    pub fn new(
        input: &Path,
        output_path: Option<PathBuf>,
        frame_rate: f64,
        mapping: MappingLog,
    ) -> Self {
        let clip_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output_path =
            output_path.unwrap_or_else(|| input.with_file_name(format!("{stem}.edl")));

        Self {
            frame_rate,
            clip_name,
            output_path,
            body: format!("TITLE: {stem}\n\n"),
            index: 1,
            mapping,
        }
    }

    /// Path the list will be written to.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn timecode(&self, frame: u64) -> String {
        format_frame_timecode(frame, self.frame_rate)
    }
}

#[async_trait]
impl EditSink for EdlSink {
    fn apply_edit_point(
        &mut self,
        point: &EditPoint,
        _audio: &[f32],
        output_start_frame: u64,
        output_end_frame: u64,
    ) {
        self.mapping.record(point, output_end_frame);

        // One frame is reserved as a buffer for motion events; spans that
        // cannot afford it are cut from the list.
        let output_span = output_end_frame.saturating_sub(output_start_frame);
        if output_span <= 1 {
            return;
        }

        self.body.push_str(&format!(
            "{:03}  AX       AA/V  C        {} {} {} {}\n",
            self.index,
            self.timecode(point.start_frame),
            self.timecode(point.end_frame),
            self.timecode(output_start_frame),
            self.timecode(output_end_frame),
        ));
        self.body
            .push_str(&format!("* FROM CLIP NAME: {}\n", self.clip_name));

        let source_span = point.span_frames();
        if !point.should_keep && output_span != source_span {
            // Rate over (span - 1) frames: the reserved buffer frame keeps
            // editing software from dropping source frames after the speed
            // change.
            let rate = source_span as f64 / (output_span - 1) as f64 * self.frame_rate;
            self.body.push_str(&format!(
                "M2   AX       {:05.1}                      {}\n",
                rate,
                self.timecode(point.start_frame),
            ));
        }

        self.body.push('\n');
        self.index += 1;
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        tokio::fs::write(&self.output_path, &self.body).await?;
        self.mapping.flush().await?;
        info!(path = %self.output_path.display(), "EDL written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(dir: &Path) -> EdlSink {
        EdlSink::new(
            &dir.join("talk.mp4"),
            None,
            30.0,
            MappingLog::new(30.0, None),
        )
    }

    #[tokio::test]
    async fn test_collapsed_spans_produce_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path());

        sink.apply_edit_point(&EditPoint::new(0, 2, false), &[], 0, 1);
        sink.apply_edit_point(&EditPoint::new(4, 6, false), &[], 3, 3);
        sink.close().await.unwrap();

        let body = tokio::fs::read_to_string(sink.output_path()).await.unwrap();
        assert_eq!(body, "TITLE: talk\n\n");
    }

    #[tokio::test]
    async fn test_kept_span_renders_without_motion_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path());

        sink.apply_edit_point(&EditPoint::new(2, 4, true), &[], 1, 3);
        sink.close().await.unwrap();

        let body = tokio::fs::read_to_string(sink.output_path()).await.unwrap();
        assert_eq!(
            body,
            "TITLE: talk\n\n\
             001  AX       AA/V  C        00:00:00:02 00:00:00:04 00:00:00:01 00:00:00:03\n\
             * FROM CLIP NAME: talk.mp4\n\n"
        );
    }

    #[tokio::test]
    async fn test_slowed_silent_span_gets_motion_effect() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path());

        // 90 source frames playing over 45 output frames.
        sink.apply_edit_point(&EditPoint::new(10, 100, false), &[], 5, 50);
        sink.close().await.unwrap();

        let body = tokio::fs::read_to_string(sink.output_path()).await.unwrap();
        // 90 / (45 - 1) * 30 = 61.36...
        assert!(body.contains("M2   AX       061.4                      00:00:00:10\n"));
    }

    #[tokio::test]
    async fn test_indices_count_only_rendered_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path());

        sink.apply_edit_point(&EditPoint::new(0, 2, false), &[], 0, 1);
        sink.apply_edit_point(&EditPoint::new(2, 4, true), &[], 1, 3);
        sink.apply_edit_point(&EditPoint::new(4, 8, true), &[], 3, 7);
        sink.close().await.unwrap();

        let body = tokio::fs::read_to_string(sink.output_path()).await.unwrap();
        assert!(body.contains("001  AX"));
        assert!(body.contains("002  AX"));
        assert!(!body.contains("003  AX"));
    }

    #[test]
    fn test_default_output_path() {
        let sink = EdlSink::new(
            Path::new("/videos/talk.mp4"),
            None,
            30.0,
            MappingLog::new(30.0, None),
        );
        assert_eq!(sink.output_path(), Path::new("/videos/talk.edl"));
    }
}
