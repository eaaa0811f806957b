//! Audio extraction for transcription.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// File name of the extracted audio inside a job work directory.
pub const AUDIO_FILE_NAME: &str = "audio.mp3";

/// Speech models expect mono 16 kHz input.
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;

pub fn audio_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .no_video()
        .output_args(["-ac", "1"])
        .output_arg("-ar")
        .output_arg(AUDIO_SAMPLE_RATE.to_string())
        .audio_codec("libmp3lame")
        .audio_bitrate("64k")
}

/// Extract the audio track of `input` into `<work_dir>/audio.mp3`.
pub async fn extract_audio(
    input: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
    timeout: Option<Duration>,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    let output = work_dir.as_ref().join(AUDIO_FILE_NAME);

    info!(input = %input.display(), output = %output.display(), "Extracting audio");

    let mut runner = FfmpegRunner::new();
    if let Some(timeout) = timeout {
        runner = runner.with_timeout(timeout);
    }
    runner.run(&audio_command(input, &output)).await?;

    if !output.exists() {
        return Err(MediaError::FileNotFound(output));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_command_is_mono_16k() {
        let args = audio_command(Path::new("clip.mp4"), Path::new("audio.mp3")).build_args();
        assert!(args.contains(&"-vn".to_string()));
        let ac = args.iter().position(|a| a == "-ac").unwrap();
        assert_eq!(args[ac + 1], "1");
        let ar = args.iter().position(|a| a == "-ar").unwrap();
        assert_eq!(args[ar + 1], "16000");
        assert_eq!(args.last().map(String::as_str), Some("audio.mp3"));
    }
}
