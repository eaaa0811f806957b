//! In-process ledgers for tests and local development.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use sclip_models::{
    CredentialRecord, Job, JobId, JobStatus, PendingAuthorization, StatusUpdate, TokenSet,
};

use crate::error::{StoreError, StoreResult};
use crate::ledger::{CredentialStore, JobLedger, PendingAuthLedger};
use crate::token::generate_state_token;

/// All three ledgers behind one lock each. Not durable.
pub struct MemoryStore {
    jobs: Mutex<HashMap<JobId, Job>>,
    credentials: Mutex<HashMap<String, CredentialRecord>>,
    pending: Mutex<HashMap<String, PendingAuthorization>>,
    state_ttl: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_state_ttl(Duration::from_secs(600))
    }

    pub fn with_state_ttl(state_ttl: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            credentials: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            state_ttl,
        }
    }

    /// Number of job rows.
    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Number of state tokens awaiting a callback.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    fn state_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.state_ttl).unwrap_or_else(|_| chrono::Duration::seconds(600))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobLedger for MemoryStore {
    async fn create(
        &self,
        id: &JobId,
        owner_id: &str,
        source_url: &str,
        status: JobStatus,
    ) -> StoreResult<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(id) {
            return Err(StoreError::duplicate_id(id.as_str()));
        }
        jobs.insert(id.clone(), Job::new(id.clone(), owner_id, source_url, status));
        Ok(())
    }

    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        update: StatusUpdate,
    ) -> StoreResult<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        job.apply_update(status, update);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        Ok(self.jobs.lock().await.get(id).cloned())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn upsert(&self, owner_id: &str, tokens: TokenSet) -> StoreResult<()> {
        let mut credentials = self.credentials.lock().await;
        match credentials.get_mut(owner_id) {
            Some(record) => record.merge(tokens),
            None => {
                credentials.insert(
                    owner_id.to_string(),
                    CredentialRecord::from_tokens(owner_id, tokens),
                );
            }
        }
        Ok(())
    }

    async fn get(&self, owner_id: &str) -> StoreResult<Option<CredentialRecord>> {
        Ok(self.credentials.lock().await.get(owner_id).cloned())
    }

    async fn delete(&self, owner_id: &str) -> StoreResult<()> {
        self.credentials.lock().await.remove(owner_id);
        Ok(())
    }
}

#[async_trait]
impl PendingAuthLedger for MemoryStore {
    async fn begin(&self, owner_id: &str) -> StoreResult<String> {
        let token = generate_state_token();
        let (now, ttl) = (Utc::now(), self.state_ttl());
        let mut pending = self.pending.lock().await;
        // Abandoned flows never reach consume
        pending.retain(|_, entry| !entry.is_expired_at(now, ttl));
        if pending.contains_key(&token) {
            return Err(StoreError::duplicate_id(token));
        }
        pending.insert(token.clone(), PendingAuthorization::new(&token, owner_id));
        Ok(token)
    }

    async fn consume(&self, state_token: &str) -> StoreResult<Option<String>> {
        let entry = self.pending.lock().await.remove(state_token);
        let Some(entry) = entry else {
            return Ok(None);
        };

        if entry.is_expired_at(Utc::now(), self.state_ttl()) {
            debug!(owner_id = %entry.owner_id, "Discarding expired state token");
            return Ok(None);
        }
        Ok(Some(entry.owner_id))
    }
}
