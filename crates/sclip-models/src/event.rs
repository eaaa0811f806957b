//! Status payloads delivered to job observers.

use std::fmt;

use crate::job::JobStatus;

/// One observable transition of a job.
///
/// Rendered to the single status string observers receive:
/// the stage name, `completed`, or `failed: <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Stage(JobStatus),
    Completed { result_ref: String },
    Failed { error: String },
}

impl JobEvent {
    pub fn status(&self) -> JobStatus {
        match self {
            JobEvent::Stage(status) => *status,
            JobEvent::Completed { .. } => JobStatus::Completed,
            JobEvent::Failed { .. } => JobStatus::Failed,
        }
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobEvent::Stage(status) => write!(f, "{}", status),
            JobEvent::Completed { .. } => write!(f, "completed"),
            JobEvent::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}
