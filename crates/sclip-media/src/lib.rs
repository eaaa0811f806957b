//! Media pipeline steps for ShortClip.
//!
//! Thin async wrappers around the `yt-dlp` and `ffmpeg` CLIs:
//! - source download
//! - 9:16 vertical clip rendering
//! - audio extraction for speech-to-text

pub mod audio;
pub mod command;
pub mod download;
pub mod error;
pub mod format;
pub mod progress;

pub use audio::{extract_audio, AUDIO_FILE_NAME};
pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::{download_source, is_http_url, SOURCE_FILE_NAME};
pub use error::{MediaError, MediaResult};
pub use format::{format_vertical, VerticalFormat, CLIP_FILE_NAME};
pub use progress::FfmpegProgress;
