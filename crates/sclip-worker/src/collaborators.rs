//! Stage collaborator seams.
//!
//! Each pipeline stage hands its real work to one of these traits. The
//! concrete yt-dlp / FFmpeg / HTTP implementations live in
//! [`crate::adapters`]; tests substitute scripted fakes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use sclip_media::MediaError;
use sclip_publish::{AuthorizedClient, PublishError, VideoMetadata};
use sclip_transcribe::TranscribeError;

/// Failure reported by a collaborator.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Transcribe(#[from] TranscribeError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("{0}")]
    Other(String),
}

impl StageError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// Fetch the source into the job directory.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, source_url: &str, work_dir: &Path) -> StageResult<PathBuf>;
}

/// Trim and reframe the source into a vertical clip.
#[async_trait]
pub trait ClipFormatter: Send + Sync {
    async fn format(&self, source: &Path, work_dir: &Path) -> StageResult<PathBuf>;
}

#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, clip: &Path, work_dir: &Path) -> StageResult<PathBuf>;
}

/// Audio track to SRT subtitle file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> StageResult<PathBuf>;
}

/// Resolve an owner to upload credentials.
///
/// Absence means the owner has not linked an account (or the link is no
/// longer usable). Implementations log their own failures.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, owner_id: &str) -> Option<AuthorizedClient>;
}

/// Publish the clip; returns the remote video id.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        client: &AuthorizedClient,
        clip: &Path,
        subtitles: Option<&Path>,
        metadata: &VideoMetadata,
    ) -> StageResult<String>;
}

/// The full set of collaborators a runner needs.
#[derive(Clone)]
pub struct Collaborators {
    pub downloader: Arc<dyn Downloader>,
    pub formatter: Arc<dyn ClipFormatter>,
    pub audio: Arc<dyn AudioExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub authorizer: Arc<dyn Authorizer>,
    pub uploader: Arc<dyn Uploader>,
}
