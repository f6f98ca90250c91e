//! Direct video rendering via FFmpeg select filters.
//!
//! The video sink collects, per edit point whose output collapses to at
//! most one frame, a `between()` expression for the video and audio select
//! filters. At close it writes the whole graph to a filter script and runs
//! a single FFmpeg pass that drops the collapsed spans in place. Spans that
//! survive with more than one output frame are kept at their original
//! speed; a cutting pass cannot retime them.
//!
//! When sections are present the graph additionally draws a progress bar
//! and per-chapter boxes with titles along the bottom edge.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use jumpcut_engine::error::SinkError;
use jumpcut_engine::section::{Section, SectionTracker};
use jumpcut_engine::sinks::{EditSink, MappingLog};
use jumpcut_models::EditPoint;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoder::select_h264_encoder;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils;
use crate::probe::MediaInfo;

/// Height of the section progress bar, in pixels.
const SECTION_BAR_HEIGHT: u32 = 50;

/// Output placement options for the video sink.
#[derive(Debug, Default)]
pub struct RenderOptions {
    /// Explicit output path; defaults to `<stem>_edited.<ext>` beside the
    /// input.
    pub output_file: Option<PathBuf>,
    /// Replace the input with the rendered output once it verifies.
    pub replace_input: bool,
    /// Probe for a hardware H.264 encoder.
    pub use_hardware_acc: bool,
}

/// Sink that cuts the input video in one FFmpeg pass.
pub struct CutVideoSink {
    input: PathBuf,
    output: PathBuf,
    replace_input: bool,
    use_hardware_acc: bool,
    temp_dir: PathBuf,
    frame_rate: f64,
    video_width: u32,
    /// Source frame count minus every removed span so far.
    output_video_frame_count: i64,
    video_exprs: Vec<String>,
    audio_exprs: Vec<String>,
    tracker: SectionTracker,
    mapping: MappingLog,
    runner: FfmpegRunner,
}

impl CutVideoSink {
    /// Create a video sink for `input`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input: &Path,
        info: &MediaInfo,
        frame_rate: f64,
        sections: Vec<Section>,
        mapping: MappingLog,
        temp_dir: &Path,
        runner: FfmpegRunner,
        options: RenderOptions,
    ) -> Self {
        let output = options
            .output_file
            .unwrap_or_else(|| default_output_path(input));

        Self {
            input: input.to_path_buf(),
            output,
            replace_input: options.replace_input,
            use_hardware_acc: options.use_hardware_acc,
            temp_dir: temp_dir.to_path_buf(),
            frame_rate,
            video_width: info.width,
            output_video_frame_count: info.video_frame_count() as i64,
            video_exprs: Vec::new(),
            audio_exprs: Vec::new(),
            tracker: SectionTracker::new(sections),
            mapping,
            runner,
        }
    }

    /// Path the rendered video is written to (before any replace).
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    async fn render(&mut self) -> MediaResult<()> {
        let tracker = std::mem::take(&mut self.tracker);
        let total_frames = self.output_video_frame_count.max(1) as u64;
        let sections = tracker.finalize(total_frames);

        let script = build_filter_script(
            &self.video_exprs,
            &self.audio_exprs,
            &sections,
            self.video_width,
            total_frames,
        );
        let script_path = self.temp_dir.join("filter_script.txt");
        tokio::fs::write(&script_path, &script).await?;

        let mut cmd = FfmpegCommand::new(&self.input, &self.output)
            .input_args(["-thread_queue_size", "1024"])
            .filter_complex_script(&script_path);
        if let Some(encoder) = select_h264_encoder(self.use_hardware_acc).await? {
            cmd = cmd.video_codec(encoder);
        }
        self.runner.run(&cmd).await?;

        if !self.output.exists() {
            return Err(MediaError::internal(format!(
                "{} was not produced; check the FFmpeg errors above",
                self.output.display()
            )));
        }
        info!(output = %self.output.display(), "Rendered cut video");

        if self.replace_input {
            self.replace_input_file().await?;
        }
        Ok(())
    }

    /// Swap the verified render into the input's place. The original is
    /// parked in the temp workspace, which is discarded with the run.
    async fn replace_input_file(&self) -> MediaResult<()> {
        let parked_name = self
            .input
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_else(|| "original".into());
        let parked = self.temp_dir.join(parked_name);

        fs_utils::move_file(&self.input, &parked).await?;
        if let Err(e) = fs_utils::move_file(&self.output, &self.input).await {
            // Put the original back before failing.
            warn!("Replace failed, restoring original input");
            fs_utils::move_file(&parked, &self.input).await?;
            return Err(e);
        }
        info!(input = %self.input.display(), "Replaced input with edited video");
        Ok(())
    }
}

#[async_trait]
impl EditSink for CutVideoSink {
    fn apply_edit_point(
        &mut self,
        point: &EditPoint,
        _audio: &[f32],
        output_start_frame: u64,
        output_end_frame: u64,
    ) {
        self.mapping.record(point, output_end_frame);

        // Only spans collapsed to at most one output frame are cut.
        if output_end_frame.saturating_sub(output_start_frame) > 1 {
            return;
        }

        // Select expressions use 1-based frame numbers with an inclusive
        // end, keeping the first frame of the removed span as a buffer.
        self.video_exprs.push(format!(
            "between(n, {}, {})",
            point.start_frame + 1,
            point.end_frame
        ));
        self.audio_exprs.push(format!(
            "between(t, {}, {})",
            (point.start_frame + 1) as f64 / self.frame_rate,
            (point.end_frame + 1) as f64 / self.frame_rate
        ));

        self.output_video_frame_count -= point.span_frames() as i64;
        self.tracker
            .observe(point, output_start_frame, output_end_frame);
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.render()
            .await
            .map_err(|e| SinkError::render(e.to_string()))?;
        self.mapping.flush().await?;
        Ok(())
    }
}

/// Default output path: `<stem>_edited.<ext>` beside the input.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    input.with_file_name(format!("{stem}_edited{ext}"))
}

/// Assemble the complex filter graph for one cutting pass.
fn build_filter_script(
    video_exprs: &[String],
    audio_exprs: &[String],
    sections: &[Section],
    video_width: u32,
    output_frame_count: u64,
) -> String {
    // not(0) keeps everything when no span was removed.
    let video_sum = if video_exprs.is_empty() {
        "0".to_string()
    } else {
        video_exprs.join("+")
    };
    let audio_sum = if audio_exprs.is_empty() {
        "0".to_string()
    } else {
        audio_exprs.join("+")
    };

    let mut script = String::new();
    if sections.is_empty() {
        script.push_str(&format!("select='not(\n{video_sum}\n)',setpts=N/FR/TB;\n"));
        script.push_str(&format!("aselect='not(\n{audio_sum}\n)',asetpts=N/SR/TB"));
        return script;
    }

    script.push_str(&format!("select='not(\n{video_sum}\n)',setpts=N/FR/TB[a];\n"));
    script.push_str(&format!("aselect='not(\n{audio_sum}\n)',asetpts=N/SR/TB;\n"));

    script.push_str(&format!(
        "color=c=#55555555:s={video_width}x{SECTION_BAR_HEIGHT}[bar];\n"
    ));
    script.push_str(&format!(
        "[a][bar]overlay=w*n/{output_frame_count}-w:H-h:shortest=1"
    ));

    for section in sections {
        let x = section.start_frame as f64 * video_width as f64 / output_frame_count as f64;
        let w = section.frame_count() as f64 * video_width as f64 / output_frame_count as f64;
        script.push_str(&format!(
            ",drawbox=x={x}:y=ih-{SECTION_BAR_HEIGHT}:w={}:h={SECTION_BAR_HEIGHT}:t=fill:c=#00005555",
            w - 1.0
        ));
        script.push_str(&format!(
            ",drawtext=x={x}+({w}-tw)/2:y=h-{SECTION_BAR_HEIGHT}+({SECTION_BAR_HEIGHT}-th)/2:\
             fontsize=24:fontcolor=white:text='{}'",
            section.title
        ));
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> MediaInfo {
        MediaInfo {
            duration: 10.0,
            width: 1920,
            height: 1080,
            fps: Some(30.0),
            has_video: true,
        }
    }

    fn sink(dir: &Path, sections: Vec<Section>) -> CutVideoSink {
        CutVideoSink::new(
            &dir.join("talk.mp4"),
            &info(),
            30.0,
            sections,
            MappingLog::new(30.0, None),
            dir,
            FfmpegRunner::new(),
            RenderOptions::default(),
        )
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/v/talk.mp4")),
            PathBuf::from("/v/talk_edited.mp4")
        );
        assert_eq!(
            default_output_path(Path::new("noext")),
            PathBuf::from("noext_edited")
        );
    }

    #[test]
    fn test_collapsed_span_becomes_select_expression() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path(), Vec::new());

        // 60-frame silent span collapsed to one output frame.
        sink.apply_edit_point(&EditPoint::new(30, 90, false), &[], 6, 7);

        assert_eq!(sink.video_exprs, vec!["between(n, 31, 90)"]);
        assert_eq!(sink.audio_exprs.len(), 1);
        assert!(sink.audio_exprs[0].starts_with("between(t, "));
        assert_eq!(sink.output_video_frame_count, 300 - 60);
    }

    #[test]
    fn test_surviving_span_is_not_cut() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink(dir.path(), Vec::new());

        sink.apply_edit_point(&EditPoint::new(0, 30, true), &[], 0, 30);

        assert!(sink.video_exprs.is_empty());
        assert_eq!(sink.output_video_frame_count, 300);
    }

    #[test]
    fn test_filter_script_without_sections() {
        let script = build_filter_script(
            &["between(n, 31, 90)".to_string()],
            &["between(t, 1.0, 3.0)".to_string()],
            &[],
            1920,
            240,
        );
        assert_eq!(
            script,
            "select='not(\nbetween(n, 31, 90)\n)',setpts=N/FR/TB;\n\
             aselect='not(\nbetween(t, 1.0, 3.0)\n)',asetpts=N/SR/TB"
        );
    }

    #[test]
    fn test_filter_script_with_no_cuts_keeps_everything() {
        let script = build_filter_script(&[], &[], &[], 1920, 300);
        assert!(script.contains("select='not(\n0\n)'"));
    }

    #[test]
    fn test_filter_script_with_sections_draws_overlay() {
        let mut section = Section::new(0, "Intro");
        section.end_frame = 120;
        let script = build_filter_script(
            &["between(n, 31, 90)".to_string()],
            &["between(t, 1.0, 3.0)".to_string()],
            &[section],
            1920,
            240,
        );
        assert!(script.contains("setpts=N/FR/TB[a];"));
        assert!(script.contains("color=c=#55555555:s=1920x50[bar];"));
        assert!(script.contains("[a][bar]overlay=w*n/240-w:H-h:shortest=1"));
        assert!(script.contains("drawbox=x=0:"));
        assert!(script.contains("text='Intro'"));
    }
}
