//! Per-input edit pipeline.
//!
//! One run takes a single input file through probing, audio extraction,
//! section resolution, and the engine, delivering into the sink the output
//! type selects. The temp workspace lives for exactly one run.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use tokio::sync::watch;
use tracing::{info, warn};

use jumpcut_engine::section::{parse_sections, Section};
use jumpcut_engine::sinks::{EditSink, EdlSink, MappingLog};
use jumpcut_engine::{Engine, Wsola};
use jumpcut_media::{
    check_ffmpeg, check_ffprobe, extract_audio, probe_media, resolve_sections_file, AudioSink,
    CutVideoSink, FfmpegRunner, MediaInfo, RenderOptions,
};
use jumpcut_models::EditConfig;

/// What kind of output one run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputType {
    /// Cut the video directly with FFmpeg select filters.
    Video,
    /// Emit an edit decision list for an NLE.
    Edl,
    /// Emit a time-remapped audio file.
    Audio,
}

/// Everything one run needs, resolved from the CLI arguments.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input_file: PathBuf,
    pub input_sections: Option<PathBuf>,
    pub output_type: OutputType,
    pub output_file: Option<PathBuf>,
    pub mapping: Option<PathBuf>,
    pub config: EditConfig,
    pub use_hardware_acc: bool,
    /// Keep intermediates here instead of a self-cleaning temp dir.
    pub temp_folder: Option<PathBuf>,
}

/// Temp workspace for one run; self-cleaning unless the user pinned it.
enum Workspace {
    Ephemeral(tempfile::TempDir),
    Pinned(PathBuf),
}

impl Workspace {
    async fn create(pinned: Option<&Path>) -> anyhow::Result<Self> {
        match pinned {
            Some(path) => {
                tokio::fs::create_dir_all(path).await?;
                Ok(Self::Pinned(path.to_path_buf()))
            }
            None => Ok(Self::Ephemeral(
                tempfile::Builder::new().prefix("jumpcut_").tempdir()?,
            )),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Ephemeral(dir) => dir.path(),
            Self::Pinned(path) => path,
        }
    }
}

/// Run the whole pipeline for one input file.
pub async fn run(request: RunRequest, cancel: watch::Receiver<bool>) -> anyhow::Result<()> {
    check_ffmpeg()?;
    check_ffprobe()?;

    let input = &request.input_file;
    let workspace = Workspace::create(request.temp_folder.as_deref()).await?;
    let temp_dir = workspace.path();

    let info = probe_media(input).await?;
    let mut config = request.config.clone();
    // The probed rate wins over the configured default.
    if let Some(fps) = info.fps {
        config.frame_rate = fps;
    }

    let runner = FfmpegRunner::new().with_cancel(cancel.clone());
    let audio = extract_audio(input, temp_dir, config.sample_rate, &runner).await?;
    config.sample_rate = audio.sample_rate();
    config.validate()?;

    let sections = resolve_sections(&request, &info, config.frame_rate).await?;
    let mapping = MappingLog::new(config.frame_rate, request.mapping.clone());

    let output_type = effective_output_type(&request, &info);
    let mut sink: Box<dyn EditSink> = match output_type {
        OutputType::Edl => Box::new(EdlSink::new(
            input,
            request.output_file.clone(),
            config.frame_rate,
            mapping,
        )),
        OutputType::Audio => Box::new(AudioSink::new(
            input,
            request.output_file.clone(),
            config.sample_rate,
            audio.channels(),
            audio.peak(),
            mapping,
            temp_dir,
            FfmpegRunner::new().with_cancel(cancel.clone()),
        )),
        OutputType::Video => {
            let replace_input = request.output_file.is_none();
            if replace_input {
                info!(input = %input.display(), "No output file given; the input will be replaced");
            }
            Box::new(CutVideoSink::new(
                input,
                &info,
                config.frame_rate,
                sections,
                mapping,
                temp_dir,
                FfmpegRunner::new().with_cancel(cancel.clone()),
                RenderOptions {
                    output_file: request.output_file.clone(),
                    replace_input,
                    use_hardware_acc: request.use_hardware_acc,
                },
            ))
        }
    };

    let stretcher = Wsola::new(config.sample_rate);
    let engine = Engine::new(config)
        .with_cancellation(cancel)
        .with_progress(Box::new(|p| {
            print!("\rProcessing: {:5.1}%", p.percent);
            let _ = std::io::stdout().flush();
        }));

    let summary = engine.run(&audio, &stretcher, sink.as_mut()).await?;
    println!();
    info!(
        input = %input.display(),
        edit_points = summary.edit_points,
        kept_points = summary.kept_points,
        output_frames = summary.output_frames,
        "Done"
    );
    Ok(())
}

/// Pick the sink type, downgrading video to audio for audio-only inputs.
fn effective_output_type(request: &RunRequest, info: &MediaInfo) -> OutputType {
    if request.output_type == OutputType::Video && !info.has_video {
        warn!(
            input = %request.input_file.display(),
            "Input has no video stream; producing audio output instead"
        );
        return OutputType::Audio;
    }
    request.output_type
}

/// Resolve and parse the sections for this run.
///
/// Sections only matter for the direct video output of an input that
/// actually has video.
async fn resolve_sections(
    request: &RunRequest,
    info: &MediaInfo,
    frame_rate: f64,
) -> anyhow::Result<Vec<Section>> {
    if request.output_type != OutputType::Video || !info.has_video {
        return Ok(Vec::new());
    }

    let Some(path) =
        resolve_sections_file(&request.input_file, request.input_sections.as_deref()).await?
    else {
        return Ok(Vec::new());
    };

    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading sections file {}", path.display()))?;
    let sections = parse_sections(&text, frame_rate)
        .with_context(|| format!("parsing sections file {}", path.display()))?;
    info!(path = %path.display(), sections = sections.len(), "Loaded sections");
    Ok(sections)
}
