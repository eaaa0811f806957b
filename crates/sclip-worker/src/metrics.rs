//! Job metrics. The exporter is installed by the binary.

use metrics::{counter, histogram};

pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "sclip_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "sclip_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "sclip_jobs_failed_total";
    pub const STAGE_DURATION_SECONDS: &str = "sclip_stage_duration_seconds";
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

pub fn record_job_failed(stage: &str) {
    let labels = [("stage", stage.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}
