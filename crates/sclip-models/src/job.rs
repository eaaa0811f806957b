//! Job records and the stage state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job status. The in-progress variants are the pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, no stage started yet
    #[default]
    Queued,
    /// Fetching the source media
    Downloading,
    /// Trimming and reformatting to a vertical clip
    Processing,
    /// Extracting the audio track
    AudioExtract,
    /// Generating captions
    Transcribing,
    /// Publishing to the video platform
    Uploading,
    /// Published successfully
    Completed,
    /// Stopped on a stage failure
    Failed,
}

impl JobStatus {
    /// Stages executed by the runner, in order.
    pub const PIPELINE: [JobStatus; 5] = [
        JobStatus::Downloading,
        JobStatus::Processing,
        JobStatus::AudioExtract,
        JobStatus::Transcribing,
        JobStatus::Uploading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Processing => "processing",
            JobStatus::AudioExtract => "audio_extract",
            JobStatus::Transcribing => "transcribing",
            JobStatus::Uploading => "uploading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// The status that follows this one on the success path.
    pub fn next(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Queued => Some(JobStatus::Downloading),
            JobStatus::Downloading => Some(JobStatus::Processing),
            JobStatus::Processing => Some(JobStatus::AudioExtract),
            JobStatus::AudioExtract => Some(JobStatus::Transcribing),
            JobStatus::Transcribing => Some(JobStatus::Uploading),
            JobStatus::Uploading => Some(JobStatus::Completed),
            JobStatus::Completed | JobStatus::Failed => None,
        }
    }

    /// Whether `to` is a permitted transition from this status.
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == JobStatus::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error parsing a stored status string.
#[derive(Debug, Error)]
#[error("Unknown job status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "downloading" => Ok(JobStatus::Downloading),
            "processing" => Ok(JobStatus::Processing),
            "audio_extract" => Ok(JobStatus::AudioExtract),
            "transcribing" => Ok(JobStatus::Transcribing),
            "uploading" => Ok(JobStatus::Uploading),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Attempted transition outside the forward path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid job transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Tracks one job's position on the forward path.
///
/// The runner owns one of these per job and asks it for every transition
/// before touching the ledger, so an out-of-order write can never be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    current: JobStatus,
}

impl JobProgress {
    pub fn new() -> Self {
        Self {
            current: JobStatus::Queued,
        }
    }

    pub fn current(&self) -> JobStatus {
        self.current
    }

    /// Move to `to`, rejecting anything but the next stage or `failed`.
    pub fn advance(&mut self, to: JobStatus) -> Result<JobStatus, TransitionError> {
        if !self.current.can_transition_to(to) {
            return Err(TransitionError {
                from: self.current,
                to,
            });
        }
        self.current = to;
        Ok(to)
    }
}

impl Default for JobProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// A job ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,
    /// Identity of the requester
    pub owner_id: String,
    /// Source video URL
    pub source_url: String,
    /// Current status
    pub status: JobStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
    /// Remote artifact identifier (set on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
    /// Failure description (set on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// Create a new job row in the given status.
    pub fn new(
        id: JobId,
        owner_id: impl Into<String>,
        source_url: impl Into<String>,
        status: JobStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id: owner_id.into(),
            source_url: source_url.into(),
            status,
            created_at: now,
            updated_at: now,
            result_ref: None,
            error: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status update with ledger semantics.
    ///
    /// `result_ref` is only written when provided; `error` is always replaced.
    pub fn apply_update(&mut self, status: JobStatus, update: StatusUpdate) {
        self.status = status;
        self.updated_at = Utc::now();
        if let Some(result_ref) = update.result_ref {
            self.result_ref = Some(result_ref);
        }
        self.error = update.error;
    }
}

/// Optional fields carried by a status update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub result_ref: Option<String>,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn completed(result_ref: impl Into<String>) -> Self {
        Self {
            result_ref: Some(result_ref.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            result_ref: None,
            error: Some(error.into()),
        }
    }
}
