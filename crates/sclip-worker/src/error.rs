//! Worker error types.

use thiserror::Error;

use sclip_models::{JobStatus, TransitionError};
use sclip_store::StoreError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Shown to owners whose job reached upload without a linked account.
pub const LINK_ACCOUNT_MESSAGE: &str =
    "no linked YouTube account: link your account with /link and submit the job again";

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{stage} failed: {message}")]
    StageFailure { stage: String, message: String },

    #[error("{}", LINK_ACCOUNT_MESSAGE)]
    AuthorizationMissing,

    #[error("invalid status transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("cancelled by request")]
    Cancelled,

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl WorkerError {
    pub fn stage_failure(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageFailure {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Errors that end the job and are written to its ledger row.
    ///
    /// The rest mean the ledger itself is unreachable and go to the caller.
    pub fn is_job_failure(&self) -> bool {
        !matches!(self, WorkerError::Store(_) | WorkerError::NotFound(_))
    }

    /// Label used for the failed-jobs metric.
    pub fn stage_label(&self, current: JobStatus) -> String {
        match self {
            WorkerError::StageFailure { stage, .. } => stage.clone(),
            WorkerError::AuthorizationMissing => "authorize".to_string(),
            WorkerError::Cancelled => "cancelled".to_string(),
            _ => current.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_message_keeps_collaborator_text() {
        let err = WorkerError::stage_failure("transcribing", "service returned 503");
        assert_eq!(err.to_string(), "transcribing failed: service returned 503");
        assert!(err.is_job_failure());
    }

    #[test]
    fn test_store_errors_are_not_job_failures() {
        let err = WorkerError::from(StoreError::not_found("j1"));
        assert!(!err.is_job_failure());
    }

    #[test]
    fn test_authorization_missing_mentions_linking() {
        let msg = WorkerError::AuthorizationMissing.to_string();
        assert!(msg.contains("link"));
        assert_eq!(
            WorkerError::AuthorizationMissing.stage_label(JobStatus::Transcribing),
            "authorize"
        );
    }
}
