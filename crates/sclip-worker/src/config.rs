//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use sclip_media::VerticalFormat;
use sclip_publish::VideoMetadata;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Parent of the per-job working directories
    pub work_dir: PathBuf,
    /// Keep job directories of completed jobs too (debugging)
    pub keep_work_dir: bool,
    /// Clip window start within the source
    pub clip_start_seconds: f64,
    /// Clip length cap
    pub clip_max_seconds: f64,
    /// Per FFmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// `{job_id}` is replaced with the job id
    pub upload_title: String,
    pub upload_description: String,
    pub upload_tags: Vec<String>,
    pub upload_privacy: String,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            work_dir: PathBuf::from("/tmp/sclip"),
            keep_work_dir: false,
            clip_start_seconds: 0.0,
            clip_max_seconds: 59.0,
            ffmpeg_timeout: Duration::from_secs(1800),
            upload_title: "Short clip {job_id}".to_string(),
            upload_description: String::new(),
            upload_tags: vec!["shorts".to_string()],
            upload_privacy: "private".to_string(),
            shutdown_timeout: Duration::from_secs(60),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            keep_work_dir: std::env::var("WORKER_KEEP_WORK_DIR")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            clip_start_seconds: std::env::var("CLIP_START_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.clip_start_seconds),
            clip_max_seconds: std::env::var("CLIP_MAX_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.clip_max_seconds),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            upload_title: std::env::var("UPLOAD_TITLE").unwrap_or(defaults.upload_title),
            upload_description: std::env::var("UPLOAD_DESCRIPTION")
                .unwrap_or(defaults.upload_description),
            upload_tags: std::env::var("UPLOAD_TAGS")
                .map(|s| parse_tags(&s))
                .unwrap_or(defaults.upload_tags),
            upload_privacy: std::env::var("UPLOAD_PRIVACY").unwrap_or(defaults.upload_privacy),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }

    /// FFmpeg settings for the clip stage.
    pub fn vertical_format(&self) -> VerticalFormat {
        VerticalFormat {
            start_secs: self.clip_start_seconds,
            max_secs: self.clip_max_seconds,
            timeout: Some(self.ffmpeg_timeout),
            ..Default::default()
        }
    }

    /// Metadata for the published video of `job_id`.
    pub fn upload_metadata(&self, job_id: &str) -> VideoMetadata {
        VideoMetadata {
            title: self.upload_title.replace("{job_id}", job_id),
            description: self.upload_description.clone(),
            tags: self.upload_tags.clone(),
            privacy_status: self.upload_privacy.clone(),
        }
    }
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
