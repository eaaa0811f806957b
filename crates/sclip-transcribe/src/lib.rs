//! Speech-to-text for ShortClip.
//!
//! Posts the extracted audio track to an OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint and stores the SRT result.

pub mod client;
pub mod error;

pub use client::{TranscribeClient, TranscribeConfig, CAPTIONS_FILE_NAME};
pub use error::{TranscribeError, TranscribeResult};
