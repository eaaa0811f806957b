//! Job observers.
//!
//! A [`Notifier`] receives one status string per transition: the stage name,
//! `completed`, or `failed: <message>`. Delivery is best effort. The runner
//! logs and discards every error a notifier returns.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use sclip_models::JobId;
use sclip_store::{ProgressChannel, ProgressEvent};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel closed")]
    Closed,

    #[error("webhook returned {0}")]
    WebhookStatus(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Store error: {0}")]
    Store(#[from] sclip_store::StoreError),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, status: &str) -> Result<(), NotifyError>;
}

/// Drops every notification.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _status: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes notifications to the log.
pub struct LogNotifier {
    job_id: JobId,
    owner_id: String,
}

impl LogNotifier {
    pub fn new(job_id: JobId, owner_id: impl Into<String>) -> Self {
        Self {
            job_id,
            owner_id: owner_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, status: &str) -> Result<(), NotifyError> {
        info!(job_id = %self.job_id, owner_id = %self.owner_id, status, "Job notification");
        Ok(())
    }
}

/// Forwards notifications into a tokio channel.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, status: &str) -> Result<(), NotifyError> {
        self.tx
            .send(status.to_string())
            .map_err(|_| NotifyError::Closed)
    }
}

/// Posts `{"content": "<@owner> job <id>: <status>"}` to a chat webhook.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
    job_id: JobId,
    owner_id: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, job_id: JobId, owner_id: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self::with_client(http, url, job_id, owner_id)
    }

    pub fn with_client(
        http: reqwest::Client,
        url: impl Into<String>,
        job_id: JobId,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            job_id,
            owner_id: owner_id.into(),
        }
    }

    pub fn message(&self, status: &str) -> String {
        format!("<@{}> job {}: {}", self.owner_id, self.job_id, status)
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, status: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "content": self.message(status) }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::WebhookStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Publishes notifications as [`ProgressEvent`]s on Redis Pub/Sub.
pub struct ProgressNotifier {
    channel: ProgressChannel,
    job_id: JobId,
    owner_id: String,
}

impl ProgressNotifier {
    pub fn new(channel: ProgressChannel, job_id: JobId, owner_id: impl Into<String>) -> Self {
        Self {
            channel,
            job_id,
            owner_id: owner_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for ProgressNotifier {
    async fn notify(&self, status: &str) -> Result<(), NotifyError> {
        let event = ProgressEvent {
            job_id: self.job_id.clone(),
            owner_id: self.owner_id.clone(),
            status: status.to_string(),
        };
        self.channel.publish(&event).await?;
        Ok(())
    }
}

/// Delivers to every inner notifier; fails only if all of them fail.
pub struct FanoutNotifier {
    inner: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(inner: Vec<Arc<dyn Notifier>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, status: &str) -> Result<(), NotifyError> {
        let mut last_error = None;
        let mut delivered = 0usize;
        for notifier in &self.inner {
            match notifier.notify(status).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(error = %e, "Notifier failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if delivered == 0 => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _status: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Other("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_channel_notifier_forwards() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify("downloading").await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("downloading"));

        drop(rx);
        assert!(matches!(notifier.notify("processing").await, Err(NotifyError::Closed)));
    }

    #[tokio::test]
    async fn test_webhook_posts_mention() {
        let server = MockServer::start().await;
        let job_id = JobId::from_string("job-1");
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({ "content": "<@42> job job-1: completed" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", server.uri()), job_id, "42");
        notifier.notify("completed").await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), JobId::new(), "42");
        let err = notifier.notify("downloading").await.unwrap_err();
        assert!(matches!(err, NotifyError::WebhookStatus(429)));
    }

    #[tokio::test]
    async fn test_fanout_tolerates_partial_failure() {
        let (channel, mut rx) = ChannelNotifier::new();
        let fanout = FanoutNotifier::new(vec![Arc::new(FailingNotifier), Arc::new(channel)]);
        fanout.notify("transcribing").await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("transcribing"));

        let all_failing = FanoutNotifier::new(vec![Arc::new(FailingNotifier)]);
        assert!(all_failing.notify("x").await.is_err());
    }
}
