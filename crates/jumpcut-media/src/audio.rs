//! Audio track extraction.
//!
//! The engine works on raw PCM, so the first step of every run extracts the
//! input's audio into a WAV file at the configured sample rate (stereo,
//! 160 kbps extraction bitrate) and loads it into memory.

use std::io::BufReader;
use std::path::Path;

use tracing::{debug, info};

use jumpcut_models::AudioBuffer;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Extract the audio track of `input` into `temp_dir` and load it.
pub async fn extract_audio(
    input: &Path,
    temp_dir: &Path,
    sample_rate: u32,
    runner: &FfmpegRunner,
) -> MediaResult<AudioBuffer> {
    let wav_path = temp_dir.join("audio.wav");

    let cmd = FfmpegCommand::new(input, &wav_path)
        .audio_bitrate("160k")
        .audio_channels(2)
        .audio_sample_rate(sample_rate)
        .no_video();
    runner.run(&cmd).await?;

    let audio = load_wav(&wav_path)?;
    info!(
        input = %input.display(),
        sample_frames = audio.sample_frames(),
        channels = audio.channels(),
        sample_rate = audio.sample_rate(),
        "Extracted audio track"
    );
    Ok(audio)
}

/// Load a WAV file into an interleaved f32 buffer.
///
/// Integer PCM is normalized into [-1, 1]; float PCM is passed through.
pub fn load_wav(path: &Path) -> MediaResult<AudioBuffer> {
    let file = std::fs::File::open(path)?;
    let mut reader = hound::WavReader::new(BufReader::new(file))?;
    let spec = reader.spec();
    debug!(path = %path.display(), ?spec, "Loading WAV");

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    if samples.is_empty() {
        return Err(MediaError::InvalidMedia(format!(
            "{} holds no audio samples",
            path.display()
        )));
    }

    Ok(AudioBuffer::new(
        samples,
        spec.channels as usize,
        spec.sample_rate,
    ))
}
