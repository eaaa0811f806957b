//! Transcription service HTTP client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{TranscribeError, TranscribeResult};

/// Subtitle file written next to the audio track.
pub const CAPTIONS_FILE_NAME: &str = "captions.srt";

/// Configuration for the transcription client.
#[derive(Debug, Clone)]
pub struct TranscribeConfig {
    /// Base URL of the service (without `/v1/...`)
    pub base_url: String,
    /// Bearer token; local servers may not need one
    pub api_key: Option<String>,
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl TranscribeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("TRANSCRIBE_API_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("TRANSCRIBE_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            model: std::env::var("TRANSCRIBE_MODEL").unwrap_or(defaults.model),
            timeout: Duration::from_secs(
                std::env::var("TRANSCRIBE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.base_url.trim_end_matches('/'))
    }
}

/// Client for the transcription service.
pub struct TranscribeClient {
    http: Client,
    config: TranscribeConfig,
}

impl TranscribeClient {
    /// Create a new client.
    pub fn new(config: TranscribeConfig) -> TranscribeResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(TranscribeError::Config("TRANSCRIBE_API_URL is empty".into()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TranscribeError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> TranscribeResult<Self> {
        Self::new(TranscribeConfig::from_env())
    }

    pub fn config(&self) -> &TranscribeConfig {
        &self.config
    }

    /// Transcribe `audio_path` and write `captions.srt` beside it.
    ///
    /// Returns the path of the subtitle file.
    pub async fn transcribe(&self, audio_path: impl AsRef<Path>) -> TranscribeResult<PathBuf> {
        let audio_path = audio_path.as_ref();
        if !audio_path.exists() {
            return Err(TranscribeError::AudioNotFound(audio_path.to_path_buf()));
        }

        let srt = self.request_srt(audio_path).await?;
        if srt.trim().is_empty() {
            return Err(TranscribeError::EmptyTranscript);
        }

        let output = audio_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CAPTIONS_FILE_NAME);
        tokio::fs::write(&output, srt.as_bytes()).await?;

        info!(
            audio = %audio_path.display(),
            captions = %output.display(),
            cues = count_cues(&srt),
            "Transcription complete"
        );
        Ok(output)
    }

    async fn request_srt(&self, audio_path: &Path) -> TranscribeResult<String> {
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(TranscribeError::Network)?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "srt");

        let url = self.config.endpoint();
        debug!("Sending transcription request to {}", url);

        let mut request = self.http.post(&url).multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::RequestFailed(format!(
                "transcription service returned {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(response.text().await?)
    }
}

/// Number of numbered cues in an SRT document.
fn count_cues(srt: &str) -> usize {
    srt.split("\n\n")
        .filter(|block| {
            block
                .trim()
                .lines()
                .next()
                .is_some_and(|first| first.trim().parse::<u32>().is_ok())
        })
        .count()
}
