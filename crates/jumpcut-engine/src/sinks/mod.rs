//! Output sinks.
//!
//! The engine never owns a sink implementation; it delivers every edit
//! event through the [`EditSink`] capability interface and finalizes with
//! `close`. Accumulation is infallible; all expensive or fallible work
//! (file writes, encode/mux subprocesses) happens at close.

pub mod edl;

use std::path::PathBuf;

use async_trait::async_trait;

use jumpcut_models::timecode::format_frame_timecode;
use jumpcut_models::EditPoint;

use crate::error::SinkError;

pub use edl::EdlSink;

/// Consumer of edit events.
#[async_trait]
pub trait EditSink: Send {
    /// Called once per edit point in ascending timeline order.
    ///
    /// `audio` is the remapped interleaved chunk; the output frame pair is
    /// the span the chunk occupies on the edited timeline. Implementations
    /// accumulate state and must not fail for well-formed input.
    fn apply_edit_point(
        &mut self,
        point: &EditPoint,
        audio: &[f32],
        output_start_frame: u64,
        output_end_frame: u64,
    );

    /// Finalize and flush. May perform expensive external work; failure
    /// here is fatal to the run.
    async fn close(&mut self) -> Result<(), SinkError>;
}

/// Shared source→output timecode mapping bookkeeping.
///
/// Every sink carries one of these; when a mapping path is configured it
/// records `<src_end_tc> <out_end_tc>` per edit point and writes the file
/// at close.
#[derive(Debug, Default)]
pub struct MappingLog {
    frame_rate: f64,
    path: Option<PathBuf>,
    lines: Vec<String>,
}

impl MappingLog {
    /// Create a mapping log; `path = None` disables it.
    pub fn new(frame_rate: f64, path: Option<PathBuf>) -> Self {
        Self {
            frame_rate,
            path,
            lines: Vec::new(),
        }
    }

    /// Record one edit point's end position on both timelines.
    pub fn record(&mut self, point: &EditPoint, output_end_frame: u64) {
        if self.path.is_none() {
            return;
        }
        self.lines.push(format!(
            "{} {}",
            format_frame_timecode(point.end_frame, self.frame_rate),
            format_frame_timecode(output_end_frame, self.frame_rate),
        ));
    }

    /// Write the mapping file, if one was configured.
    pub async fn flush(&self) -> Result<(), SinkError> {
        if let Some(path) = &self.path {
            let mut body = self.lines.join("\n");
            body.push('\n');
            tokio::fs::write(path, body).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mapping_log_disabled_is_a_no_op() {
        let mut log = MappingLog::new(30.0, None);
        log.record(&EditPoint::new(0, 60, true), 60);
        log.flush().await.unwrap();
        assert!(log.lines.is_empty());
    }

    #[tokio::test]
    async fn test_mapping_log_writes_timecode_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.txt");
        let mut log = MappingLog::new(30.0, Some(path.clone()));

        log.record(&EditPoint::new(0, 60, true), 60);
        log.record(&EditPoint::new(60, 150, false), 63);
        log.flush().await.unwrap();

        let body = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(body, "00:00:02:00 00:00:02:00\n00:00:05:00 00:00:02:03\n");
    }
}
