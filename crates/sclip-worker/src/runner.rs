//! Drives one job through the pipeline.
//!
//! Stage order is fixed: download, format, audio extract, transcribe, then
//! authorize and upload. Every transition goes through [`JobProgress`] before
//! it is written to the ledger, and the observer is told after each write.
//! The first collaborator error ends the job as `failed`; nothing is retried
//! or rolled back, and a failed job's working directory is left on disk.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::Instrument;

use sclip_models::{JobEvent, JobId, JobProgress, JobStatus, StatusUpdate};
use sclip_store::JobLedger;

use crate::collaborators::{Collaborators, StageResult};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::notifier::Notifier;

/// Per-job state carried between stages.
struct JobContext<'a> {
    id: &'a JobId,
    owner_id: &'a str,
    source_url: &'a str,
    work_dir: PathBuf,
    progress: JobProgress,
    logger: JobLogger,
    notifier: &'a dyn Notifier,
    cancel: Option<watch::Receiver<bool>>,
}

impl JobContext<'_> {
    fn check_cancelled(&self) -> WorkerResult<()> {
        let cancelled = self.cancel.as_ref().is_some_and(|rx| *rx.borrow());
        if cancelled {
            return Err(WorkerError::Cancelled);
        }
        Ok(())
    }

    /// Observer errors are logged and dropped.
    async fn observe(&self, event: &JobEvent) {
        if let Err(e) = self.notifier.notify(&event.to_string()).await {
            self.logger
                .log_warning(&format!("notification '{}' not delivered: {}", event, e));
        }
    }
}

pub struct JobRunner {
    ledger: Arc<dyn JobLedger>,
    collaborators: Collaborators,
    config: WorkerConfig,
}

impl JobRunner {
    pub fn new(ledger: Arc<dyn JobLedger>, collaborators: Collaborators, config: WorkerConfig) -> Self {
        Self {
            ledger,
            collaborators,
            config,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn JobLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Create a job and drive it to a terminal state.
    ///
    /// Returns the job id once the job is `completed` or `failed`; the
    /// outcome is in the ledger. Ledger errors are returned instead.
    pub async fn run(
        &self,
        owner_id: &str,
        source_url: &str,
        notifier: Arc<dyn Notifier>,
    ) -> WorkerResult<JobId> {
        let id = JobId::new();
        self.create(&id, owner_id, source_url).await?;
        self.execute(&id, owner_id, source_url, notifier.as_ref(), None)
            .await?;
        Ok(id)
    }

    /// Insert the ledger row in `queued`.
    pub async fn create(&self, id: &JobId, owner_id: &str, source_url: &str) -> WorkerResult<()> {
        self.ledger
            .create(id, owner_id, source_url, JobStatus::Queued)
            .await?;
        metrics::record_job_submitted();
        Ok(())
    }

    /// Drive a job created with [`JobRunner::create`] to a terminal state.
    pub async fn execute(
        &self,
        id: &JobId,
        owner_id: &str,
        source_url: &str,
        notifier: &dyn Notifier,
        cancel: Option<watch::Receiver<bool>>,
    ) -> WorkerResult<JobStatus> {
        let logger = JobLogger::new(id, owner_id);
        let span = logger.create_span();

        let mut ctx = JobContext {
            id,
            owner_id,
            source_url,
            work_dir: self.config.work_dir.join(id.as_str()),
            progress: JobProgress::new(),
            logger,
            notifier,
            cancel,
        };

        async move {
            ctx.logger.log_start(ctx.source_url);
            let outcome = self.pipeline(&mut ctx).await;
            let result = self.finish(&mut ctx, outcome).await;
            if matches!(result, Ok(JobStatus::Completed)) {
                self.cleanup(&ctx).await;
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn pipeline(&self, ctx: &mut JobContext<'_>) -> WorkerResult<String> {
        let c = &self.collaborators;

        self.enter(ctx, JobStatus::Downloading).await?;
        tokio::fs::create_dir_all(&ctx.work_dir).await.map_err(|e| {
            WorkerError::stage_failure(
                JobStatus::Downloading.as_str(),
                format!("cannot create working directory: {e}"),
            )
        })?;
        let source = self
            .stage(ctx, JobStatus::Downloading, c.downloader.download(ctx.source_url, &ctx.work_dir))
            .await?;

        self.enter(ctx, JobStatus::Processing).await?;
        let clip = self
            .stage(ctx, JobStatus::Processing, c.formatter.format(&source, &ctx.work_dir))
            .await?;

        self.enter(ctx, JobStatus::AudioExtract).await?;
        let audio = self
            .stage(ctx, JobStatus::AudioExtract, c.audio.extract(&clip, &ctx.work_dir))
            .await?;

        self.enter(ctx, JobStatus::Transcribing).await?;
        let subtitles = self
            .stage(ctx, JobStatus::Transcribing, c.transcriber.transcribe(&audio))
            .await?;

        ctx.check_cancelled()?;
        let client = c
            .authorizer
            .authorize(ctx.owner_id)
            .await
            .ok_or(WorkerError::AuthorizationMissing)?;

        self.enter(ctx, JobStatus::Uploading).await?;
        let metadata = self.config.upload_metadata(ctx.id.as_str());
        self.stage(
            ctx,
            JobStatus::Uploading,
            c.uploader.upload(&client, &clip, Some(subtitles.as_path()), &metadata),
        )
        .await
    }

    /// Record the terminal state and tell the observer.
    async fn finish(
        &self,
        ctx: &mut JobContext<'_>,
        outcome: WorkerResult<String>,
    ) -> WorkerResult<JobStatus> {
        match outcome {
            Ok(result_ref) => {
                self.transition(ctx, JobStatus::Completed, StatusUpdate::completed(&result_ref))
                    .await?;
                ctx.logger.log_completion(&result_ref);
                metrics::record_job_completed();
                ctx.observe(&JobEvent::Completed { result_ref }).await;
                Ok(JobStatus::Completed)
            }
            Err(e) if e.is_job_failure() => {
                let message = e.to_string();
                let stage = e.stage_label(ctx.progress.current());
                ctx.logger.log_error(&stage, &message);
                metrics::record_job_failed(&stage);

                self.transition(ctx, JobStatus::Failed, StatusUpdate::failed(&message))
                    .await?;
                ctx.observe(&JobEvent::Failed { error: message }).await;

                match e {
                    WorkerError::InvalidTransition(_) => Err(e),
                    _ => Ok(JobStatus::Failed),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn enter(&self, ctx: &mut JobContext<'_>, stage: JobStatus) -> WorkerResult<()> {
        ctx.check_cancelled()?;
        self.transition(ctx, stage, StatusUpdate::none()).await?;
        ctx.logger.log_stage(stage);
        ctx.observe(&JobEvent::Stage(stage)).await;
        Ok(())
    }

    async fn transition(
        &self,
        ctx: &mut JobContext<'_>,
        status: JobStatus,
        update: StatusUpdate,
    ) -> WorkerResult<()> {
        ctx.progress.advance(status)?;
        self.ledger.update_status(ctx.id, status, update).await?;
        Ok(())
    }

    /// Time one collaborator call and tag its error with the stage.
    ///
    /// A panicking collaborator is a stage failure like any other.
    async fn stage<T>(
        &self,
        ctx: &JobContext<'_>,
        stage: JobStatus,
        call: impl Future<Output = StageResult<T>>,
    ) -> WorkerResult<T> {
        let started = Instant::now();
        let result = AssertUnwindSafe(call).catch_unwind().await;
        let elapsed = started.elapsed().as_secs_f64();

        metrics::record_stage_duration(stage.as_str(), elapsed);
        ctx.logger.log_stage_done(stage, elapsed);

        match result {
            Ok(result) => {
                result.map_err(|e| WorkerError::stage_failure(stage.as_str(), e.to_string()))
            }
            Err(payload) => Err(WorkerError::stage_failure(
                stage.as_str(),
                format!("collaborator panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }

    async fn cleanup(&self, ctx: &JobContext<'_>) {
        if self.config.keep_work_dir {
            return;
        }
        remove_work_dir(&ctx.work_dir, &ctx.logger).await;
    }
}

/// Text of a panic payload, when it carries one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn remove_work_dir(path: &Path, logger: &JobLogger) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => logger.log_warning(&format!(
            "failed to remove working directory {}: {}",
            path.display(),
            e
        )),
    }
}
