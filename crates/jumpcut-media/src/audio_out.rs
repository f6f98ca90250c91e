//! Audio-only output.
//!
//! Accumulates the remapped audio chunks (normalized by the source track's
//! peak), writes them to a WAV in the temp workspace at close, and
//! re-encodes that WAV into the requested container with FFmpeg.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use jumpcut_engine::error::SinkError;
use jumpcut_engine::sinks::{EditSink, MappingLog};
use jumpcut_models::EditPoint;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Sink producing a time-remapped audio file.
pub struct AudioSink {
    output: PathBuf,
    temp_dir: PathBuf,
    sample_rate: u32,
    channels: usize,
    /// Peak of the source track; chunks are divided by it on arrival.
    peak: f32,
    samples: Vec<f32>,
    mapping: MappingLog,
    runner: FfmpegRunner,
}

impl AudioSink {
    /// Create an audio sink for `input`.
    ///
    /// Without an explicit output the result lands beside the input as
    /// `<stem>_edited.<ext>`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input: &Path,
        output_file: Option<PathBuf>,
        sample_rate: u32,
        channels: usize,
        peak: f32,
        mapping: MappingLog,
        temp_dir: &Path,
        runner: FfmpegRunner,
    ) -> Self {
        let output = output_file.unwrap_or_else(|| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let ext = input
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            input.with_file_name(format!("{stem}_edited{ext}"))
        });

        Self {
            output,
            temp_dir: temp_dir.to_path_buf(),
            sample_rate,
            channels: channels.max(1),
            peak,
            samples: Vec::new(),
            mapping,
            runner,
        }
    }

    /// Path the edited audio is written to.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    fn write_wav(&self, path: &Path) -> MediaResult<()> {
        let spec = hound::WavSpec {
            channels: self.channels as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &s in &self.samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
        Ok(())
    }

    async fn render(&self) -> MediaResult<()> {
        let wav_path = self.temp_dir.join("audio_new.wav");
        self.write_wav(&wav_path)?;

        let cmd = FfmpegCommand::new(&wav_path, &self.output)
            .input_args(["-thread_queue_size", "1024"])
            .output_args(["-strict", "-2"]);
        self.runner.run(&cmd).await?;

        info!(
            output = %self.output.display(),
            sample_frames = self.samples.len() / self.channels,
            "Rendered edited audio"
        );
        Ok(())
    }
}

#[async_trait]
impl EditSink for AudioSink {
    fn apply_edit_point(
        &mut self,
        point: &EditPoint,
        audio: &[f32],
        _output_start_frame: u64,
        output_end_frame: u64,
    ) {
        self.mapping.record(point, output_end_frame);

        if self.peak > 0.0 {
            self.samples.extend(audio.iter().map(|&s| s / self.peak));
        } else {
            self.samples.extend_from_slice(audio);
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.render()
            .await
            .map_err(|e| SinkError::render(e.to_string()))?;
        self.mapping.flush().await?;
        Ok(())
    }
}
