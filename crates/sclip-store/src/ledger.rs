//! Ledger interfaces shared by every backend.

use async_trait::async_trait;

use sclip_models::{CredentialRecord, Job, JobId, JobStatus, StatusUpdate, TokenSet};

use crate::error::StoreResult;

/// Durable record of every job.
///
/// Implementations persist each write before returning.
#[async_trait]
pub trait JobLedger: Send + Sync {
    /// Insert a new job row. Fails with `DuplicateId` if `id` exists.
    async fn create(
        &self,
        id: &JobId,
        owner_id: &str,
        source_url: &str,
        status: JobStatus,
    ) -> StoreResult<()>;

    /// Update status and `updated_at`.
    ///
    /// `result_ref` is written only when provided. `error` is always
    /// overwritten, so an update without one clears any stored error.
    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        update: StatusUpdate,
    ) -> StoreResult<()>;

    /// Fetch a job row.
    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>>;
}

/// Owner id to OAuth token set.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert or merge; an omitted refresh token keeps the stored one.
    async fn upsert(&self, owner_id: &str, tokens: TokenSet) -> StoreResult<()>;

    async fn get(&self, owner_id: &str) -> StoreResult<Option<CredentialRecord>>;

    async fn delete(&self, owner_id: &str) -> StoreResult<()>;
}

/// Single-use state tokens for the account-linking callback.
#[async_trait]
pub trait PendingAuthLedger: Send + Sync {
    /// Generate and persist a new state token for `owner_id`.
    async fn begin(&self, owner_id: &str) -> StoreResult<String>;

    /// Atomically read and delete. A second call with the same token returns `None`.
    async fn consume(&self, state_token: &str) -> StoreResult<Option<String>>;
}
