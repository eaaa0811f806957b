//! Vertical (9:16) clip rendering.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// File name of the formatted clip inside a job work directory.
pub const CLIP_FILE_NAME: &str = "clip.mp4";

/// Output geometry and encoder settings for the vertical clip.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalFormat {
    pub start_secs: f64,
    /// Short-form platforms cap clip length
    pub max_secs: f64,
    pub width: u32,
    pub height: u32,
    pub crf: u8,
    pub preset: String,
    pub audio_bitrate: String,
    pub timeout: Option<Duration>,
}

impl Default for VerticalFormat {
    fn default() -> Self {
        Self {
            start_secs: 0.0,
            max_secs: 59.0,
            width: 1080,
            height: 1920,
            crf: 23,
            preset: "veryfast".to_string(),
            audio_bitrate: "128k".to_string(),
            timeout: Some(Duration::from_secs(1800)),
        }
    }
}

impl VerticalFormat {
    /// Center crop to the target aspect ratio, then scale.
    pub fn filter(&self) -> String {
        let divisor = gcd(self.width, self.height).max(1);
        format!(
            "crop=ih*{}/{}:ih,scale={}:{}",
            self.width / divisor,
            self.height / divisor,
            self.width,
            self.height
        )
    }

    /// Build the FFmpeg command for `input` -> `output`.
    pub fn command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(input, output);
        if self.start_secs > 0.0 {
            cmd = cmd.seek(self.start_secs);
        }
        cmd.duration(self.max_secs)
            .video_filter(self.filter())
            .video_codec("libx264")
            .preset(self.preset.clone())
            .crf(self.crf)
            .audio_codec("aac")
            .audio_bitrate(self.audio_bitrate.clone())
            .output_args(["-movflags", "+faststart"])
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Render `input` as a vertical clip at `<work_dir>/clip.mp4`.
pub async fn format_vertical(
    input: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
    format: &VerticalFormat,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    let output = work_dir.as_ref().join(CLIP_FILE_NAME);

    info!(
        input = %input.display(),
        output = %output.display(),
        max_secs = format.max_secs,
        "Formatting vertical clip"
    );

    let mut runner = FfmpegRunner::new();
    if let Some(timeout) = format.timeout {
        runner = runner.with_timeout(timeout);
    }
    runner.run(&format.command(input, &output)).await?;

    if !output.exists() {
        return Err(MediaError::FileNotFound(output));
    }
    Ok(output)
}
