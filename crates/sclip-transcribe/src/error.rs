//! Transcription client error types.

use std::path::PathBuf;

use thiserror::Error;

pub type TranscribeResult<T> = Result<T, TranscribeError>;

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Transcription request failed: {0}")]
    RequestFailed(String),

    #[error("Transcription service returned an empty transcript")]
    EmptyTranscript,

    #[error("Audio file not found: {0}")]
    AudioNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
