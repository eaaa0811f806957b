//! Structured job logging utilities.

use tracing::{error, info, warn, Span};

use sclip_models::{JobId, JobStatus};

/// Job logger carrying the job and owner on every event.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    owner_id: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, owner_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            owner_id: owner_id.to_string(),
        }
    }

    /// Log the start of a job.
    pub fn log_start(&self, source_url: &str) {
        info!(
            job_id = %self.job_id,
            owner_id = %self.owner_id,
            source_url = %source_url,
            "Job started"
        );
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: JobStatus) {
        info!(
            job_id = %self.job_id,
            owner_id = %self.owner_id,
            stage = %stage,
            "Job stage"
        );
    }

    /// Log a stage that finished, with its wall time.
    pub fn log_stage_done(&self, stage: JobStatus, elapsed_secs: f64) {
        info!(
            job_id = %self.job_id,
            stage = %stage,
            elapsed_secs,
            "Job stage finished"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            owner_id = %self.owner_id,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, stage: &str, message: &str) {
        error!(
            job_id = %self.job_id,
            owner_id = %self.owner_id,
            stage = %stage,
            "Job failed: {}", message
        );
    }

    pub fn log_completion(&self, result_ref: &str) {
        info!(
            job_id = %self.job_id,
            owner_id = %self.owner_id,
            result_ref = %result_ref,
            "Job completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Span wrapping the whole job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            owner_id = %self.owner_id
        )
    }
}
