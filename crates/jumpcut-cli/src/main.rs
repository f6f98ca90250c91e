//! Silence-driven jump-cut editor CLI.

mod pipeline;

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jumpcut_media::{check_ytdlp, download_video};
use jumpcut_models::EditConfig;
use pipeline::{OutputType, RunRequest};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "jumpcut",
    about = "Modifies a video file to play at different speeds when there is sound vs. silence."
)]
struct Cli {
    /// The video file you want modified, or a directory of them
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// Sections file: one "<timecode> <title>" per line
    #[arg(long)]
    input_sections: Option<PathBuf>,

    /// A video URL to download and process
    #[arg(long)]
    url: Option<String>,

    /// Output type
    #[arg(long, value_enum, default_value_t = OutputType::Video)]
    output_type: OutputType,

    /// The output file; defaults next to the input, and for video output
    /// its absence means the input is replaced in place
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Write a source-to-output timecode mapping to this file
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Volume ratio, relative to the track peak, a frame must reach to
    /// count as sounded (0 to 1)
    #[arg(long, default_value_t = 0.03)]
    silent_threshold: f64,

    /// Playback speed for sounded spans
    #[arg(long, default_value_t = 1.0)]
    sounded_speed: f64,

    /// Playback speed for silent spans; very large values jump-cut
    #[arg(long, default_value_t = 5.0)]
    silent_speed: f64,

    /// Silent frames kept on either side of speech, for context
    #[arg(long, default_value_t = 1.0)]
    frame_margin: f64,

    /// Audio sample rate the input is resampled to
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Frame rate fallback when stream probing fails
    #[arg(long, default_value_t = 30.0)]
    frame_rate: f64,

    /// Seconds at the start that are never cut
    #[arg(long, default_value_t = 0.0)]
    keep_start: f64,

    /// Seconds at the end that are never cut
    #[arg(long, default_value_t = 0.0)]
    keep_end: f64,

    /// [Experimental] Probe for a hardware H.264 encoder
    #[arg(long, env = "JUMPCUT_HW_ACC")]
    use_hardware_acc: bool,

    /// Keep intermediates in this folder instead of a temp dir
    #[arg(long, env = "JUMPCUT_TEMP_FOLDER")]
    temp_folder: Option<PathBuf>,
}

impl Cli {
    fn edit_config(&self) -> EditConfig {
        let mut config = EditConfig::default()
            .with_threshold(self.silent_threshold)
            .with_speeds(self.silent_speed, self.sounded_speed)
            .with_margin(self.frame_margin)
            .with_sample_rate(self.sample_rate)
            .with_frame_rate(self.frame_rate);
        config.keep_start_secs = self.keep_start;
        config.keep_end_secs = self.keep_end;
        config
    }

    fn request_for(&self, input_file: PathBuf, output_file: Option<PathBuf>) -> RunRequest {
        RunRequest {
            input_file,
            input_sections: self.input_sections.clone(),
            output_type: self.output_type,
            output_file,
            mapping: self.mapping.clone(),
            config: self.edit_config(),
            use_hardware_acc: self.use_hardware_acc,
            temp_folder: self.temp_folder.clone(),
        }
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("jumpcut=info".parse().expect("static directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Files that are never edit inputs even when sitting in the input dir.
fn is_auxiliary_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("sec") | Some("edl") | Some("txt")
    )
}

/// Collect the (input, output) pairs for a directory run.
async fn batch_pairs(
    input_dir: &Path,
    output_dir: Option<&Path>,
) -> anyhow::Result<Vec<(PathBuf, Option<PathBuf>)>> {
    let mut pairs = Vec::new();
    let mut entries = tokio::fs::read_dir(input_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || is_auxiliary_file(&path) {
            continue;
        }
        let output = output_dir
            .filter(|d| d.is_dir())
            .and_then(|d| path.file_name().map(|name| d.join(name)));
        pairs.push((path, output));
    }
    pairs.sort();
    Ok(pairs)
}

/// Process every batch pair in order, isolating per-input failures.
///
/// A failed input is logged and counted; siblings still run. The batch as a
/// whole errors only when every input failed.
async fn run_batch<F, Fut>(
    pairs: &[(PathBuf, Option<PathBuf>)],
    mut run_one: F,
) -> anyhow::Result<()>
where
    F: FnMut(PathBuf, Option<PathBuf>) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let mut failures = 0usize;
    for (input_file, output_file) in pairs {
        info!(input = %input_file.display(), "Processing");
        if let Err(e) = run_one(input_file.clone(), output_file.clone()).await {
            // One bad file must not sink the whole batch.
            error!(input = %input_file.display(), error = %e, "Failed to process");
            failures += 1;
        }
    }

    if !pairs.is_empty() && failures == pairs.len() {
        anyhow::bail!("all {} inputs failed", failures);
    }
    if failures > 0 {
        warn!(failures, total = pairs.len(), "Batch finished with failures");
    }
    Ok(())
}

async fn run(cli: Cli, cancel: watch::Receiver<bool>) -> anyhow::Result<()> {
    if let Some(url) = &cli.url {
        check_ytdlp()?;
        let dest = std::env::current_dir()?;
        let input = download_video(url, &dest).await?;
        return pipeline::run(
            cli.request_for(input, cli.output_file.clone()),
            cancel,
        )
        .await;
    }

    let Some(input) = cli.input_file.clone() else {
        anyhow::bail!("either --input_file or --url is required");
    };

    if input.is_dir() {
        let pairs = batch_pairs(&input, cli.output_file.as_deref()).await?;
        if pairs.is_empty() {
            anyhow::bail!("no input files found in {}", input.display());
        }

        return run_batch(&pairs, |input_file, output_file| {
            pipeline::run(cli.request_for(input_file, output_file), cancel.clone())
        })
        .await;
    }

    pipeline::run(cli.request_for(input, cli.output_file.clone()), cancel).await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = cancel_tx.send(true);
        }
    });

    if let Err(e) = run(cli, cancel_rx).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["jumpcut", "--input-file", "talk.mp4"]);
        let config = cli.edit_config();
        assert_eq!(config.silent_threshold, 0.03);
        assert_eq!(config.speeds.silent, 5.0);
        assert_eq!(config.speeds.sounded, 1.0);
        assert_eq!(config.frame_margin, 1.0);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(cli.output_type, OutputType::Video);
    }

    #[test]
    fn test_cli_output_type_parses() {
        let cli = Cli::parse_from(["jumpcut", "--input-file", "a.mp4", "--output-type", "edl"]);
        assert_eq!(cli.output_type, OutputType::Edl);
    }

    #[test]
    fn test_auxiliary_files_are_skipped() {
        assert!(is_auxiliary_file(Path::new("talk.sec")));
        assert!(is_auxiliary_file(Path::new("talk.edl")));
        assert!(!is_auxiliary_file(Path::new("talk.mp4")));
    }

    #[tokio::test]
    async fn test_batch_continues_past_a_failing_input() {
        let pairs = vec![
            (PathBuf::from("broken.mp4"), None),
            (PathBuf::from("fine.mp4"), None),
            (PathBuf::from("other.mp4"), None),
        ];

        let attempted = std::cell::RefCell::new(Vec::new());
        let result = run_batch(&pairs, |input, _output| {
            attempted.borrow_mut().push(input.clone());
            async move {
                if input.to_string_lossy().contains("broken") {
                    anyhow::bail!("demuxer error");
                }
                Ok(())
            }
        })
        .await;

        // The first failure is absorbed; the remaining inputs still run.
        assert!(result.is_ok());
        assert_eq!(attempted.borrow().len(), 3);
        assert_eq!(attempted.borrow()[1], PathBuf::from("fine.mp4"));
    }

    #[tokio::test]
    async fn test_batch_errors_only_when_every_input_fails() {
        let pairs = vec![
            (PathBuf::from("a.mp4"), None),
            (PathBuf::from("b.mp4"), None),
        ];

        let err = run_batch(&pairs, |_input, _output| async {
            anyhow::bail!("no such file")
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("all 2 inputs failed"));
    }

    #[tokio::test]
    async fn test_batch_pairs_maps_outputs() {
        let input_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();
        tokio::fs::write(input_dir.path().join("a.mp4"), b"x")
            .await
            .unwrap();
        tokio::fs::write(input_dir.path().join("b.mp4"), b"x")
            .await
            .unwrap();
        tokio::fs::write(input_dir.path().join("a.sec"), b"0:10 Intro")
            .await
            .unwrap();

        let pairs = batch_pairs(input_dir.path(), Some(output_dir.path()))
            .await
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.file_name().unwrap(), "a.mp4");
        assert_eq!(
            pairs[0].1.as_deref(),
            Some(output_dir.path().join("a.mp4").as_path())
        );
    }
}
