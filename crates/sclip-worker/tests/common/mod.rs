//! Scripted collaborators for runner and executor tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use sclip_models::{Job, JobId, JobStatus};
use sclip_publish::{AuthorizedClient, VideoMetadata};
use sclip_store::{JobLedger, MemoryStore};
use sclip_worker::{
    AudioExtractor, Authorizer, ClipFormatter, Collaborators, Downloader, JobRunner, Notifier,
    NotifyError, StageError, StageResult, Transcriber, Uploader, WorkerConfig,
};

/// Ordered record of collaborator invocations.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, name: &str) {
        self.0.lock().unwrap().push(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }
}

/// What the fakes should do.
#[derive(Clone)]
pub struct Scenario {
    /// One of `download`, `format`, `audio`, `transcribe`, `upload`
    pub fail_at: Option<&'static str>,
    pub fail_message: String,
    /// Stage whose collaborator panics instead of returning
    pub panic_at: Option<&'static str>,
    pub linked: bool,
    /// Download blocks until notified
    pub download_gate: Option<Arc<Notify>>,
    pub video_id: String,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            fail_at: None,
            fail_message: "boom".to_string(),
            panic_at: None,
            linked: true,
            download_gate: None,
            video_id: "yt-video-1".to_string(),
        }
    }
}

impl Scenario {
    pub fn failing_at(stage: &'static str, message: &str) -> Self {
        Self {
            fail_at: Some(stage),
            fail_message: message.to_string(),
            ..Default::default()
        }
    }

    pub fn panicking_at(stage: &'static str) -> Self {
        Self {
            panic_at: Some(stage),
            ..Default::default()
        }
    }
}

struct FakeStage {
    name: &'static str,
    output: &'static str,
    log: CallLog,
    scenario: Scenario,
}

impl FakeStage {
    async fn run(&self, dir: &Path) -> StageResult<PathBuf> {
        self.log.push(self.name);
        if self.name == "download" {
            if let Some(gate) = &self.scenario.download_gate {
                gate.notified().await;
            }
        }
        if self.scenario.panic_at == Some(self.name) {
            panic!("{} collaborator crashed", self.name);
        }
        if self.scenario.fail_at == Some(self.name) {
            return Err(StageError::other(self.scenario.fail_message.clone()));
        }
        Ok(dir.join(self.output))
    }
}

#[async_trait]
impl Downloader for FakeStage {
    async fn download(&self, _source_url: &str, work_dir: &Path) -> StageResult<PathBuf> {
        self.run(work_dir).await
    }
}

#[async_trait]
impl ClipFormatter for FakeStage {
    async fn format(&self, _source: &Path, work_dir: &Path) -> StageResult<PathBuf> {
        self.run(work_dir).await
    }
}

#[async_trait]
impl AudioExtractor for FakeStage {
    async fn extract(&self, _clip: &Path, work_dir: &Path) -> StageResult<PathBuf> {
        self.run(work_dir).await
    }
}

#[async_trait]
impl Transcriber for FakeStage {
    async fn transcribe(&self, audio: &Path) -> StageResult<PathBuf> {
        let dir = audio.parent().unwrap_or_else(|| Path::new("."));
        self.run(dir).await
    }
}

struct FakeAuthorizer {
    log: CallLog,
    linked: bool,
}

#[async_trait]
impl Authorizer for FakeAuthorizer {
    async fn authorize(&self, owner_id: &str) -> Option<AuthorizedClient> {
        self.log.push("authorize");
        self.linked.then(|| AuthorizedClient {
            owner_id: owner_id.to_string(),
            access_token: "token".to_string(),
            token_type: "Bearer".to_string(),
        })
    }
}

/// Arguments the uploader was called with.
#[derive(Debug, Clone)]
pub struct UploadCall {
    pub owner_id: String,
    pub clip: PathBuf,
    pub subtitles: Option<PathBuf>,
    pub metadata: VideoMetadata,
}

struct FakeUploader {
    log: CallLog,
    scenario: Scenario,
    seen: Arc<Mutex<Vec<UploadCall>>>,
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn upload(
        &self,
        client: &AuthorizedClient,
        clip: &Path,
        subtitles: Option<&Path>,
        metadata: &VideoMetadata,
    ) -> StageResult<String> {
        self.log.push("upload");
        self.seen.lock().unwrap().push(UploadCall {
            owner_id: client.owner_id.clone(),
            clip: clip.to_path_buf(),
            subtitles: subtitles.map(Path::to_path_buf),
            metadata: metadata.clone(),
        });
        if self.scenario.fail_at == Some("upload") {
            return Err(StageError::other(self.scenario.fail_message.clone()));
        }
        Ok(self.scenario.video_id.clone())
    }
}

/// Everything a test needs to inspect after a run.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub log: CallLog,
    pub uploads: Arc<Mutex<Vec<UploadCall>>>,
    pub work: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            log: CallLog::default(),
            uploads: Arc::new(Mutex::new(Vec::new())),
            work: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config(&self) -> WorkerConfig {
        WorkerConfig {
            work_dir: self.work.path().to_path_buf(),
            shutdown_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    pub fn collaborators(&self, scenario: &Scenario) -> Collaborators {
        let stage = |name: &'static str, output: &'static str| {
            Arc::new(FakeStage {
                name,
                output,
                log: self.log.clone(),
                scenario: scenario.clone(),
            })
        };
        Collaborators {
            downloader: stage("download", "source.mp4"),
            formatter: stage("format", "clip.mp4"),
            audio: stage("audio", "audio.mp3"),
            transcriber: stage("transcribe", "captions.srt"),
            authorizer: Arc::new(FakeAuthorizer {
                log: self.log.clone(),
                linked: scenario.linked,
            }),
            uploader: Arc::new(FakeUploader {
                log: self.log.clone(),
                scenario: scenario.clone(),
                seen: self.uploads.clone(),
            }),
        }
    }

    pub fn runner(&self, scenario: &Scenario) -> JobRunner {
        self.runner_with_config(scenario, self.config())
    }

    pub fn runner_with_config(&self, scenario: &Scenario, config: WorkerConfig) -> JobRunner {
        JobRunner::new(self.store.clone(), self.collaborators(scenario), config)
    }

    pub async fn job(&self, id: &JobId) -> Job {
        JobLedger::get(self.store.as_ref(), id)
            .await
            .unwrap()
            .expect("job row missing")
    }
}

/// Everything currently buffered in a notification channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(status) = rx.try_recv() {
        out.push(status);
    }
    out
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _status: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Other("chat offline".into()))
    }
}

/// Poll the ledger until `done` holds or a couple of seconds pass.
pub async fn wait_for_status(
    harness: &Harness,
    id: &JobId,
    done: impl Fn(JobStatus) -> bool,
) -> Job {
    for _ in 0..200 {
        let job = harness.job(id).await;
        if done(job.status) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach the expected status", id);
}
