//! In-process app with fake pipeline collaborators.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

use sclip_api::{create_router, ApiConfig, AppState};
use sclip_publish::{AuthorizedClient, OAuthClient, OAuthConfig, VideoMetadata};
use sclip_store::{CredentialStore, MemoryStore};
use sclip_worker::{
    AudioExtractor, Authorizer, ClipFormatter, Collaborators, Downloader, JobExecutor, JobRunner,
    StageResult, Transcriber, Uploader, WorkerConfig,
};

/// Writes placeholder files for every stage. Authorizes owners that have a
/// stored credential and uploads as `yt-<owner>`.
pub struct FakePipeline {
    store: Arc<MemoryStore>,
    gate: Option<Arc<Notify>>,
}

async fn touch(dir: &Path, name: &str) -> StageResult<PathBuf> {
    let path = dir.join(name);
    tokio::fs::write(&path, b"fake")
        .await
        .map_err(|e| sclip_worker::StageError::other(e.to_string()))?;
    Ok(path)
}

#[async_trait]
impl Downloader for FakePipeline {
    async fn download(&self, _source_url: &str, work_dir: &Path) -> StageResult<PathBuf> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        touch(work_dir, "source.mp4").await
    }
}

#[async_trait]
impl ClipFormatter for FakePipeline {
    async fn format(&self, _source: &Path, work_dir: &Path) -> StageResult<PathBuf> {
        touch(work_dir, "clip.mp4").await
    }
}

#[async_trait]
impl AudioExtractor for FakePipeline {
    async fn extract(&self, _clip: &Path, work_dir: &Path) -> StageResult<PathBuf> {
        touch(work_dir, "audio.mp3").await
    }
}

#[async_trait]
impl Transcriber for FakePipeline {
    async fn transcribe(&self, audio: &Path) -> StageResult<PathBuf> {
        let dir = audio.parent().unwrap_or(Path::new("."));
        touch(dir, "captions.srt").await
    }
}

#[async_trait]
impl Authorizer for FakePipeline {
    async fn authorize(&self, owner_id: &str) -> Option<AuthorizedClient> {
        let record = CredentialStore::get(self.store.as_ref(), owner_id)
            .await
            .ok()
            .flatten()?;
        Some(AuthorizedClient {
            owner_id: record.owner_id,
            access_token: record.access_token,
            token_type: record.token_type,
        })
    }
}

#[async_trait]
impl Uploader for FakePipeline {
    async fn upload(
        &self,
        client: &AuthorizedClient,
        _clip: &Path,
        _subtitles: Option<&Path>,
        _metadata: &VideoMetadata,
    ) -> StageResult<String> {
        Ok(format!("yt-{}", client.owner_id))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub gate: Arc<Notify>,
    _work: TempDir,
}

pub struct AppOptions {
    pub token_url: String,
    pub gated: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            token_url: "http://127.0.0.1:9/token".to_string(),
            gated: false,
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(AppOptions::default())
    }

    pub fn with_options(options: AppOptions) -> Self {
        let store = Arc::new(MemoryStore::new());
        let work = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());

        let fake = Arc::new(FakePipeline {
            store: store.clone(),
            gate: options.gated.then(|| gate.clone()),
        });
        let collaborators = Collaborators {
            downloader: fake.clone(),
            formatter: fake.clone(),
            audio: fake.clone(),
            transcriber: fake.clone(),
            authorizer: fake.clone(),
            uploader: fake,
        };

        let worker_config = WorkerConfig {
            work_dir: work.path().to_path_buf(),
            ..Default::default()
        };
        let runner = JobRunner::new(store.clone(), collaborators, worker_config);
        let executor = Arc::new(JobExecutor::new(runner));

        let oauth = OAuthClient::new(
            OAuthConfig::new("client-id", "client-secret")
                .with_redirect_base("https://clips.example.com")
                .with_token_url(options.token_url),
        )
        .unwrap();

        let state = AppState::new(
            ApiConfig::default(),
            executor,
            store.clone(),
            store.clone(),
            oauth,
        );

        Self {
            router: create_router(state, None),
            store,
            gate,
            _work: work,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, headers, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .request(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = self.request(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    pub async fn submit(&self, owner_id: &str, source_url: &str) -> String {
        let (status, body) = self
            .post_json(
                "/api/jobs",
                serde_json::json!({ "owner_id": owner_id, "source_url": source_url }),
            )
            .await;
        assert_eq!(status, StatusCode::ACCEPTED, "submit failed: {body}");
        body["job_id"].as_str().unwrap().to_string()
    }

    /// Poll until the job reaches `completed` or `failed`.
    pub async fn wait_terminal(&self, job_id: &str) -> Value {
        for _ in 0..200 {
            let (status, job) = self.get(&format!("/api/jobs/{job_id}")).await;
            assert_eq!(status, StatusCode::OK);
            if matches!(job["status"].as_str(), Some("completed" | "failed")) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {job_id} did not finish");
    }
}
