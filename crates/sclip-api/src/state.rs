//! Application state.

use std::sync::Arc;

use sclip_models::JobId;
use sclip_publish::OAuthClient;
use sclip_store::{CredentialStore, PendingAuthLedger, ProgressChannel, RedisStore};
use sclip_worker::{FanoutNotifier, JobExecutor, LogNotifier, Notifier, ProgressNotifier, WebhookNotifier};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub executor: Arc<JobExecutor>,
    pub credentials: Arc<dyn CredentialStore>,
    pub pending: Arc<dyn PendingAuthLedger>,
    pub oauth: OAuthClient,
    /// Checked by `/ready` when present
    pub redis: Option<RedisStore>,
    pub progress: Option<ProgressChannel>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        executor: Arc<JobExecutor>,
        credentials: Arc<dyn CredentialStore>,
        pending: Arc<dyn PendingAuthLedger>,
        oauth: OAuthClient,
    ) -> Self {
        Self {
            config,
            executor,
            credentials,
            pending,
            oauth,
            redis: None,
            progress: None,
        }
    }

    pub fn with_redis(mut self, redis: RedisStore) -> Self {
        self.redis = Some(redis);
        self
    }

    pub fn with_progress(mut self, progress: ProgressChannel) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Observer for one job: the log, plus the chat webhook and Pub/Sub when configured.
    pub fn notifier_for(&self, job_id: &JobId, owner_id: &str) -> Arc<dyn Notifier> {
        let mut notifiers: Vec<Arc<dyn Notifier>> =
            vec![Arc::new(LogNotifier::new(job_id.clone(), owner_id))];

        if let Some(url) = &self.config.notify_webhook_url {
            notifiers.push(Arc::new(WebhookNotifier::new(url.clone(), job_id.clone(), owner_id)));
        }
        if let Some(progress) = &self.progress {
            notifiers.push(Arc::new(ProgressNotifier::new(
                progress.clone(),
                job_id.clone(),
                owner_id,
            )));
        }

        Arc::new(FanoutNotifier::new(notifiers))
    }
}
