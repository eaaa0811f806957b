//! Job executor.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{watch, Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use sclip_models::{Job, JobId};

use crate::error::{WorkerError, WorkerResult};
use crate::notifier::Notifier;
use crate::runner::{panic_message, JobRunner};

/// Runs submitted jobs in the background, at most `max_concurrent_jobs` at once.
pub struct JobExecutor {
    runner: Arc<JobRunner>,
    job_semaphore: Arc<Semaphore>,
    /// Cancel flags for jobs that have not finished yet
    active: Arc<Mutex<HashMap<JobId, watch::Sender<bool>>>>,
}

impl JobExecutor {
    pub fn new(runner: JobRunner) -> Self {
        let max = runner.config().max_concurrent_jobs.max(1);
        Self {
            runner: Arc::new(runner),
            job_semaphore: Arc::new(Semaphore::new(max)),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    /// Create the job row and start it. Returns as soon as the row exists.
    pub async fn submit(
        &self,
        owner_id: &str,
        source_url: &str,
        notifier: Arc<dyn Notifier>,
    ) -> WorkerResult<JobId> {
        self.submit_with_id(JobId::new(), owner_id, source_url, notifier)
            .await
    }

    /// Like [`submit`](Self::submit) with a caller-chosen id, so the notifier
    /// can be built for the job before it starts.
    pub async fn submit_with_id(
        &self,
        id: JobId,
        owner_id: &str,
        source_url: &str,
        notifier: Arc<dyn Notifier>,
    ) -> WorkerResult<JobId> {
        self.runner.create(&id, owner_id, source_url).await?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.active.lock().await.insert(id.clone(), cancel_tx);

        let runner = Arc::clone(&self.runner);
        let semaphore = Arc::clone(&self.job_semaphore);
        let active = Arc::clone(&self.active);
        let job_id = id.clone();
        let owner_id = owner_id.to_string();
        let source_url = source_url.to_string();

        tokio::spawn(async move {
            match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    let execution = runner.execute(
                        &job_id,
                        &owner_id,
                        &source_url,
                        notifier.as_ref(),
                        Some(cancel_rx),
                    );
                    // Collaborator panics are handled per stage; this covers
                    // the ledger and the notifier. The flag is removed either way.
                    match AssertUnwindSafe(execution).catch_unwind().await {
                        Ok(Ok(status)) => debug!(job_id = %job_id, status = %status, "Job finished"),
                        Ok(Err(e)) => error!(job_id = %job_id, error = %e, "Job execution error"),
                        Err(payload) => error!(
                            job_id = %job_id,
                            panic = %panic_message(payload.as_ref()),
                            "Job task panicked"
                        ),
                    }
                }
                Err(_) => warn!(job_id = %job_id, "Executor closed before job could start"),
            }
            active.lock().await.remove(&job_id);
        });

        info!(job_id = %id, "Job submitted");
        Ok(id)
    }

    /// Ask a running or waiting job to stop at its next stage boundary.
    ///
    /// Returns false if the job is not active in this executor.
    pub async fn cancel(&self, id: &JobId) -> bool {
        match self.active.lock().await.get(id) {
            Some(flag) => {
                flag.send_replace(true);
                info!(job_id = %id, "Cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Current ledger row for `id`.
    pub async fn get_status(&self, id: &JobId) -> WorkerResult<Job> {
        self.runner
            .ledger()
            .get(id)
            .await?
            .ok_or_else(|| WorkerError::NotFound(id.to_string()))
    }

    /// Jobs submitted and not yet finished.
    pub async fn in_flight(&self) -> usize {
        self.active.lock().await.len()
    }

    /// Wait until no job is active. Returns false on timeout.
    pub async fn wait_for_jobs(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                if self.active.lock().await.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Wait for in-flight jobs, then close the executor.
    pub async fn shutdown(&self) {
        let in_flight = self.in_flight().await;
        info!("Waiting for {} in-flight jobs to complete...", in_flight);
        if !self.wait_for_jobs(self.runner.config().shutdown_timeout).await {
            warn!(
                remaining = self.in_flight().await,
                "Shutdown timeout reached with jobs still running"
            );
        }
        self.job_semaphore.close();
    }
}
