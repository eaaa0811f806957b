//! Production collaborators backed by yt-dlp, FFmpeg and HTTP clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use sclip_media::{download_source, extract_audio, format_vertical, VerticalFormat};
use sclip_publish::{AuthorizedClient, CredentialAuthorizer, VideoMetadata, YouTubeUploader};
use sclip_transcribe::TranscribeClient;

use crate::collaborators::{
    AudioExtractor, Authorizer, ClipFormatter, Collaborators, Downloader, StageResult,
    Transcriber, Uploader,
};
use crate::config::WorkerConfig;

pub struct YtDlpDownloader;

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, source_url: &str, work_dir: &Path) -> StageResult<PathBuf> {
        Ok(download_source(source_url, work_dir).await?)
    }
}

pub struct FfmpegClipFormatter {
    format: VerticalFormat,
}

impl FfmpegClipFormatter {
    pub fn new(format: VerticalFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl ClipFormatter for FfmpegClipFormatter {
    async fn format(&self, source: &Path, work_dir: &Path) -> StageResult<PathBuf> {
        Ok(format_vertical(source, work_dir, &self.format).await?)
    }
}

pub struct FfmpegAudioExtractor {
    timeout: Option<Duration>,
}

impl FfmpegAudioExtractor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract(&self, clip: &Path, work_dir: &Path) -> StageResult<PathBuf> {
        Ok(extract_audio(clip, work_dir, self.timeout).await?)
    }
}

#[async_trait]
impl Transcriber for TranscribeClient {
    async fn transcribe(&self, audio: &Path) -> StageResult<PathBuf> {
        Ok(TranscribeClient::transcribe(self, audio).await?)
    }
}

#[async_trait]
impl Authorizer for CredentialAuthorizer {
    async fn authorize(&self, owner_id: &str) -> Option<AuthorizedClient> {
        CredentialAuthorizer::authorize(self, owner_id).await
    }
}

#[async_trait]
impl Uploader for YouTubeUploader {
    async fn upload(
        &self,
        client: &AuthorizedClient,
        clip: &Path,
        subtitles: Option<&Path>,
        metadata: &VideoMetadata,
    ) -> StageResult<String> {
        Ok(YouTubeUploader::upload(self, client, clip, subtitles, metadata).await?)
    }
}

impl Collaborators {
    /// yt-dlp and FFmpeg from `PATH`, plus the given service clients.
    pub fn production(
        config: &WorkerConfig,
        transcriber: TranscribeClient,
        authorizer: CredentialAuthorizer,
        uploader: YouTubeUploader,
    ) -> Self {
        Self {
            downloader: Arc::new(YtDlpDownloader),
            formatter: Arc::new(FfmpegClipFormatter::new(config.vertical_format())),
            audio: Arc::new(FfmpegAudioExtractor::new(Some(config.ffmpeg_timeout))),
            transcriber: Arc::new(transcriber),
            authorizer: Arc::new(authorizer),
            uploader: Arc::new(uploader),
        }
    }
}
