//! End-to-end edit pipeline.
//!
//! The engine owns the analysis-to-delivery sequence: classify frame
//! loudness, dilate and segment into edit points, remap each point's audio,
//! and hand every event to the sink in timeline order. It is purely
//! in-memory; all I/O lives in the sinks and in the callers that produce
//! the audio buffer.

use tokio::sync::watch;
use tracing::{debug, info};

use jumpcut_models::{AudioBuffer, EditConfig};

use crate::error::{EngineError, EngineResult};
use crate::extract::extract_edit_points;
use crate::loudness::classify_loudness;
use crate::remap::TimeRemapper;
use crate::sinks::EditSink;
use crate::stretch::TimeStretch;

/// Progress of one engine run, in source frames.
#[derive(Debug, Clone, Copy)]
pub struct EditProgress {
    /// Source frames consumed so far.
    pub current_frame: u64,
    /// Total source frames in the run.
    pub total_frames: u64,
    /// Completion percentage, 0..=100.
    pub percent: f64,
}

/// Progress callback; invoked at most every whole percent of advancement.
pub type ProgressFn = Box<dyn Fn(EditProgress) + Send>;

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy)]
pub struct EditSummary {
    /// Total edit points delivered to the sink.
    pub edit_points: usize,
    /// How many of them were kept (sounded) spans.
    pub kept_points: usize,
    /// Length of the edited timeline in video frames.
    pub output_frames: u64,
    /// Length of the edited audio in sample frames.
    pub output_sample_frames: u64,
}

/// Drives one edit run over an audio buffer.
pub struct Engine {
    config: EditConfig,
    progress: Option<ProgressFn>,
    cancel: Option<watch::Receiver<bool>>,
}

impl Engine {
    /// Create an engine with the given configuration.
    pub fn new(config: EditConfig) -> Self {
        Self {
            config,
            progress: None,
            cancel: None,
        }
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attach a cancellation signal; a `true` observation between edit
    /// points aborts the run with [`EngineError::Cancelled`].
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run the full pipeline: classify, segment, remap, deliver, close.
    ///
    /// The sink's `close` is awaited only after every edit point has been
    /// delivered; a cancelled or failed run never closes the sink.
    pub async fn run(
        &self,
        audio: &AudioBuffer,
        stretcher: &dyn TimeStretch,
        sink: &mut dyn EditSink,
    ) -> EngineResult<EditSummary> {
        let loudness = classify_loudness(audio, &self.config)?;
        let total_frames = loudness.len() as u64;
        let points = extract_edit_points(&loudness, self.config.frame_margin)?;

        info!(
            total_frames,
            edit_points = points.len(),
            "Starting edit run"
        );

        let samples_per_frame = self.config.samples_per_frame();
        let mut remapper = TimeRemapper::new(&self.config, audio.channels(), stretcher);

        let mut kept_points = 0usize;
        let mut output_frames = 0u64;
        let mut last_reported = 0.0f64;

        for point in &points {
            self.check_cancelled()?;

            let start = (point.start_frame as f64 * samples_per_frame) as usize;
            let end = (point.end_frame as f64 * samples_per_frame) as usize;
            let slice = audio.frame_slice(start, end);

            if let Some(chunk) = remapper.remap(point, slice)? {
                sink.apply_edit_point(
                    point,
                    &chunk.samples,
                    chunk.output_start_frame,
                    chunk.output_end_frame,
                );
                output_frames = chunk.output_end_frame;
            }
            if point.should_keep {
                kept_points += 1;
            }

            self.report_progress(point.end_frame, total_frames, &mut last_reported);
        }

        self.check_cancelled()?;
        sink.close().await?;

        let summary = EditSummary {
            edit_points: points.len(),
            kept_points,
            output_frames,
            output_sample_frames: remapper.cursor(),
        };
        info!(
            edit_points = summary.edit_points,
            kept_points = summary.kept_points,
            output_frames = summary.output_frames,
            "Edit run complete"
        );
        Ok(summary)
    }

    fn check_cancelled(&self) -> EngineResult<()> {
        if let Some(cancel) = &self.cancel {
            if *cancel.borrow() {
                debug!("Edit run cancelled");
                return Err(EngineError::Cancelled);
            }
        }
        Ok(())
    }

    /// Report progress, throttled to whole-percent steps; 100% always fires.
    fn report_progress(&self, current_frame: u64, total_frames: u64, last_reported: &mut f64) {
        let Some(progress) = &self.progress else {
            return;
        };
        let percent = current_frame as f64 / total_frames as f64 * 100.0;
        if percent - *last_reported <= 1.0 && percent < 100.0 {
            return;
        }
        *last_reported = percent;
        progress(EditProgress {
            current_frame,
            total_frames,
            percent,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::error::{SinkError, StretchError};
    use jumpcut_models::EditPoint;

    /// Decimating stub with an exact output length, so frame accounting in
    /// the summary is deterministic.
    struct ExactStretch;

    impl TimeStretch for ExactStretch {
        fn stretch(
            &self,
            samples: &[f32],
            channels: usize,
            speed: f64,
        ) -> Result<Vec<f32>, StretchError> {
            let frames = samples.len() / channels.max(1);
            if frames == 0 {
                return Err(StretchError::EmptyInput);
            }
            let out_frames = (frames as f64 / speed).round() as usize;
            let mut out = Vec::with_capacity(out_frames * channels);
            for i in 0..out_frames {
                let src = ((i as f64 * speed) as usize).min(frames - 1);
                out.extend_from_slice(&samples[src * channels..(src + 1) * channels]);
            }
            Ok(out)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<(EditPoint, u64, u64)>,
        closed: bool,
    }

    #[async_trait]
    impl EditSink for RecordingSink {
        fn apply_edit_point(
            &mut self,
            point: &EditPoint,
            _audio: &[f32],
            output_start_frame: u64,
            output_end_frame: u64,
        ) {
            self.events
                .push((*point, output_start_frame, output_end_frame));
        }

        async fn close(&mut self) -> Result<(), SinkError> {
            self.closed = true;
            Ok(())
        }
    }

    fn config() -> EditConfig {
        // 10 samples per video frame, no fade so audio passes unscaled.
        EditConfig {
            sample_rate: 300,
            frame_rate: 30.0,
            fade_envelope_size: 0,
            frame_margin: 0.0,
            ..EditConfig::default()
        }
    }

    fn audio_with_frames(frames: &[f32]) -> AudioBuffer {
        let samples: Vec<f32> = frames.iter().flat_map(|&v| vec![v; 10]).collect();
        AudioBuffer::new(samples, 1, 300)
    }

    #[tokio::test]
    async fn test_pipeline_delivers_points_in_order() {
        // Frames: 2 silent, 2 loud, 2 silent. Speeds 5x / 1x.
        let audio = audio_with_frames(&[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        let mut sink = RecordingSink::default();

        let summary = Engine::new(config())
            .run(&audio, &ExactStretch, &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.edit_points, 3);
        assert_eq!(summary.kept_points, 1);
        assert!(sink.closed);

        let points: Vec<EditPoint> = sink.events.iter().map(|(p, _, _)| *p).collect();
        assert_eq!(
            points,
            vec![
                EditPoint::new(0, 2, false),
                EditPoint::new(2, 4, true),
                EditPoint::new(4, 6, false),
            ]
        );

        // 20 samples at 5x -> 4, 20 at 1x -> 20, 20 at 5x -> 4. The output
        // clock runs 0..4..24..28 samples, i.e. frames 1, 3, 3 after ceil.
        assert_eq!(sink.events[0].1, 0);
        assert_eq!(sink.events[0].2, 1);
        assert_eq!(sink.events[1].1, 1);
        assert_eq!(sink.events[1].2, 3);
        assert_eq!(sink.events[2].1, 3);
        assert_eq!(sink.events[2].2, 3);
        assert_eq!(summary.output_sample_frames, 28);
        assert_eq!(summary.output_frames, 3);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_without_closing_sink() {
        let audio = audio_with_frames(&[0.0, 0.0, 1.0, 1.0]);
        let mut sink = RecordingSink::default();

        let (tx, rx) = watch::channel(true);
        let result = Engine::new(config())
            .with_cancellation(rx)
            .run(&audio, &ExactStretch, &mut sink)
            .await;

        assert!(matches!(result, Err(EngineError::Cancelled)));
        assert!(sink.events.is_empty());
        assert!(!sink.closed);
        drop(tx);
    }

    #[tokio::test]
    async fn test_progress_reaches_one_hundred_percent() {
        let audio = audio_with_frames(&[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        let mut sink = RecordingSink::default();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_cb = Arc::clone(&seen);
        let summary = Engine::new(config())
            .with_progress(Box::new(move |p| {
                seen_in_cb.lock().unwrap().push(p.percent);
            }))
            .run(&audio, &ExactStretch, &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.edit_points, 3);
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert_eq!(*seen.last().unwrap(), 100.0);
    }

    #[tokio::test]
    async fn test_all_silent_audio_yields_single_point() {
        let audio = audio_with_frames(&[0.0, 0.0, 0.0, 0.0]);
        let mut sink = RecordingSink::default();

        let summary = Engine::new(config())
            .run(&audio, &ExactStretch, &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.edit_points, 1);
        assert_eq!(summary.kept_points, 0);
        assert_eq!(sink.events[0].0, EditPoint::new(0, 4, false));
    }

    #[tokio::test]
    async fn test_margin_merges_adjacent_loud_spans() {
        // Two loud frames separated by one silent frame; margin 1 bridges it.
        let audio = audio_with_frames(&[0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
        let mut sink = RecordingSink::default();

        let mut cfg = config();
        cfg.frame_margin = 1.0;
        let summary = Engine::new(cfg)
            .run(&audio, &ExactStretch, &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.edit_points, 3);
        assert_eq!(sink.events[1].0, EditPoint::new(1, 6, true));
    }
}
