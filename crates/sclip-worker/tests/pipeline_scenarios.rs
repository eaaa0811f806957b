//! End-to-end runner scenarios against the in-memory ledger.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{drain, FailingNotifier, Harness, Scenario};
use sclip_models::{Job, JobId, JobStatus, StatusUpdate};
use sclip_store::{JobLedger, StoreError, StoreResult};
use sclip_worker::{ChannelNotifier, JobRunner, WorkerError, LINK_ACCOUNT_MESSAGE};

const SOURCE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

#[tokio::test]
async fn test_all_stages_succeed() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::default());
    let (notifier, mut rx) = ChannelNotifier::new();

    let id = runner.run("owner-1", SOURCE, Arc::new(notifier)).await.unwrap();

    let job = harness.job(&id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result_ref.as_deref(), Some("yt-video-1"));
    assert_eq!(job.error, None);
    assert_eq!(job.owner_id, "owner-1");
    assert_eq!(job.source_url, SOURCE);
    assert!(job.updated_at >= job.created_at);

    assert_eq!(
        drain(&mut rx),
        [
            "downloading",
            "processing",
            "audio_extract",
            "transcribing",
            "uploading",
            "completed"
        ]
    );
    assert_eq!(
        harness.log.calls(),
        ["download", "format", "audio", "transcribe", "authorize", "upload"]
    );
}

#[tokio::test]
async fn test_upload_receives_prior_stage_outputs() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::default());

    let id = runner
        .run("owner-1", SOURCE, Arc::new(sclip_worker::NoopNotifier))
        .await
        .unwrap();

    let uploads = harness.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    let job_dir = harness.work.path().join(id.as_str());
    assert_eq!(uploads[0].owner_id, "owner-1");
    assert_eq!(uploads[0].clip, job_dir.join("clip.mp4"));
    assert_eq!(uploads[0].subtitles.as_deref(), Some(job_dir.join("captions.srt").as_path()));
    assert!(uploads[0].metadata.title.contains(id.as_str()));
}

#[tokio::test]
async fn test_missing_credential_never_uploads() {
    let harness = Harness::new();
    let scenario = Scenario {
        linked: false,
        ..Default::default()
    };
    let runner = harness.runner(&scenario);
    let (notifier, mut rx) = ChannelNotifier::new();

    let id = runner.run("owner-2", SOURCE, Arc::new(notifier)).await.unwrap();

    let job = harness.job(&id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some(LINK_ACCOUNT_MESSAGE));
    assert_eq!(job.result_ref, None);
    assert_eq!(harness.log.count("upload"), 0);

    let statuses = drain(&mut rx);
    assert!(!statuses.iter().any(|s| s == "uploading"));
    let last = statuses.last().unwrap();
    assert!(last.starts_with("failed: "));
    assert!(last.contains("link"));
}

#[tokio::test]
async fn test_transcription_failure_is_terminal() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::failing_at("transcribe", "speech service unavailable"));
    let (notifier, mut rx) = ChannelNotifier::new();

    let id = runner.run("owner-3", SOURCE, Arc::new(notifier)).await.unwrap();

    let job = harness.job(&id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("speech service unavailable"));

    let statuses = drain(&mut rx);
    for stage in ["downloading", "processing", "audio_extract"] {
        assert_eq!(statuses.iter().filter(|s| s.as_str() == stage).count(), 1, "{stage}");
    }
    assert!(!statuses.iter().any(|s| s == "uploading" || s == "completed"));
    assert_eq!(
        statuses.last().map(String::as_str),
        Some("failed: transcribing failed: speech service unavailable")
    );
    assert_eq!(harness.log.count("authorize"), 0);
    assert_eq!(harness.log.count("upload"), 0);
}

#[tokio::test]
async fn test_download_failure_stops_before_format() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::failing_at("download", "HTTP Error 404"));
    let (notifier, mut rx) = ChannelNotifier::new();

    let id = runner.run("owner-4", SOURCE, Arc::new(notifier)).await.unwrap();

    let job = harness.job(&id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("downloading failed: HTTP Error 404"));
    assert_eq!(harness.log.calls(), ["download"]);
    assert_eq!(
        drain(&mut rx),
        ["downloading", "failed: downloading failed: HTTP Error 404"]
    );
}

#[tokio::test]
async fn test_upload_failure_records_platform_error() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::failing_at("upload", "quotaExceeded"));

    let id = runner
        .run("owner-5", SOURCE, Arc::new(sclip_worker::NoopNotifier))
        .await
        .unwrap();

    let job = harness.job(&id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("uploading failed: quotaExceeded"));
    assert_eq!(job.result_ref, None);
}

#[tokio::test]
async fn test_notifier_failure_does_not_abort_job() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::default());

    let id = runner
        .run("owner-6", SOURCE, Arc::new(FailingNotifier))
        .await
        .unwrap();

    assert_eq!(harness.job(&id).await.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_work_dir_removed_after_job() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::default());

    let id = runner
        .run("owner-7", SOURCE, Arc::new(sclip_worker::NoopNotifier))
        .await
        .unwrap();
    assert!(!harness.work.path().join(id.as_str()).exists());

    let keep = sclip_worker::WorkerConfig {
        keep_work_dir: true,
        ..harness.config()
    };
    let runner = harness.runner_with_config(&Scenario::default(), keep);
    let id = runner
        .run("owner-7", SOURCE, Arc::new(sclip_worker::NoopNotifier))
        .await
        .unwrap();
    assert!(harness.work.path().join(id.as_str()).is_dir());
}

#[tokio::test]
async fn test_failed_job_leaves_work_dir() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::failing_at("audio", "no audio stream"));

    let id = runner
        .run("owner-9", SOURCE, Arc::new(sclip_worker::NoopNotifier))
        .await
        .unwrap();
    assert_eq!(harness.job(&id).await.status, JobStatus::Failed);
    assert!(harness.work.path().join(id.as_str()).is_dir());
}

#[tokio::test]
async fn test_panicking_collaborator_fails_job() {
    let harness = Harness::new();
    let runner = harness.runner(&Scenario::panicking_at("format"));
    let (notifier, mut rx) = ChannelNotifier::new();

    let id = runner.run("owner-10", SOURCE, Arc::new(notifier)).await.unwrap();

    let job = harness.job(&id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("processing failed: collaborator panicked: format collaborator crashed")
    );
    assert_eq!(harness.log.calls(), ["download", "format"]);
    let statuses = drain(&mut rx);
    assert!(statuses.last().unwrap().starts_with("failed: processing failed"));
}

#[tokio::test]
async fn test_unwritable_work_dir_fails_job() {
    let harness = Harness::new();
    let blocker = harness.work.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();
    let config = sclip_worker::WorkerConfig {
        work_dir: blocker,
        ..harness.config()
    };
    let runner = harness.runner_with_config(&Scenario::default(), config);

    let id = runner
        .run("owner-11", SOURCE, Arc::new(sclip_worker::NoopNotifier))
        .await
        .unwrap();

    let job = harness.job(&id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job
        .error
        .as_deref()
        .unwrap()
        .starts_with("downloading failed: cannot create working directory"));
    assert!(harness.log.calls().is_empty());
}

/// Accepts the row, then rejects every status write.
struct BrokenLedger;

#[async_trait]
impl JobLedger for BrokenLedger {
    async fn create(&self, _: &JobId, _: &str, _: &str, _: JobStatus) -> StoreResult<()> {
        Ok(())
    }

    async fn update_status(&self, id: &JobId, _: JobStatus, _: StatusUpdate) -> StoreResult<()> {
        Err(StoreError::corrupt(id.as_str(), "disk full"))
    }

    async fn get(&self, _: &JobId) -> StoreResult<Option<Job>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_ledger_errors_propagate_to_caller() {
    let harness = Harness::new();
    let runner = JobRunner::new(
        Arc::new(BrokenLedger),
        harness.collaborators(&Scenario::default()),
        harness.config(),
    );

    let err = runner
        .run("owner-8", SOURCE, Arc::new(sclip_worker::NoopNotifier))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Store(_)));
    assert!(harness.log.calls().is_empty());
}
