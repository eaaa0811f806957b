//! Redis-backed durable ledgers.
//!
//! Layout:
//! - `{prefix}:job:{id}` hash with the job fields
//! - `{prefix}:credential:{owner_id}` hash with the token fields
//! - `{prefix}:oauth_state:{token}` JSON string with a TTL
//!
//! Every mutation is a single command or Lua script, so writes to one key are
//! serialized by Redis. Durability across restarts relies on the server
//! running with AOF persistence (`appendonly yes`, `appendfsync always`).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::{debug, info};

use sclip_models::{
    CredentialRecord, Job, JobId, JobStatus, PendingAuthorization, StatusUpdate, TokenSet,
};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::ledger::{CredentialStore, JobLedger, PendingAuthLedger};
use crate::token::generate_state_token;

const CREATE_JOB_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1],
  'id', ARGV[1], 'owner_id', ARGV[2], 'source_url', ARGV[3],
  'status', ARGV[4], 'created_at', ARGV[5], 'updated_at', ARGV[5])
return 1
"#;

const UPDATE_JOB_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
redis.call('HSET', KEYS[1], 'status', ARGV[1], 'updated_at', ARGV[2])
if ARGV[3] == '1' then
  redis.call('HSET', KEYS[1], 'result_ref', ARGV[4])
end
if ARGV[5] == '1' then
  redis.call('HSET', KEYS[1], 'error', ARGV[6])
else
  redis.call('HDEL', KEYS[1], 'error')
end
return 1
"#;

const UPSERT_CREDENTIAL_SCRIPT: &str = r#"
redis.call('HSET', KEYS[1],
  'owner_id', ARGV[1], 'access_token', ARGV[2], 'scope', ARGV[3],
  'token_type', ARGV[4], 'updated_at', ARGV[5])
if ARGV[6] == '1' then
  redis.call('HSET', KEYS[1], 'refresh_token', ARGV[7])
end
if ARGV[8] == '1' then
  redis.call('HSET', KEYS[1], 'expiry', ARGV[9])
else
  redis.call('HDEL', KEYS[1], 'expiry')
end
return 1
"#;

/// Durable ledgers on Redis.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    config: StoreConfig,
}

impl RedisStore {
    /// Create a new store.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StoreConfig::from_env())
    }

    /// Round-trip a PING, used by readiness checks.
    pub async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Underlying client, shared with the progress channel.
    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    fn job_key(&self, id: &JobId) -> String {
        format!("{}:job:{}", self.config.key_prefix, id)
    }

    fn credential_key(&self, owner_id: &str) -> String {
        format!("{}:credential:{}", self.config.key_prefix, owner_id)
    }

    fn state_key(&self, token: &str) -> String {
        format!("{}:oauth_state:{}", self.config.key_prefix, token)
    }
}

fn flag(present: bool) -> &'static str {
    if present {
        "1"
    } else {
        "0"
    }
}

/// ARGV for [`UPDATE_JOB_SCRIPT`]. An absent `result_ref` leaves the stored
/// one alone; an absent `error` clears it.
fn update_job_args(status: JobStatus, update: &StatusUpdate, now: &str) -> Vec<String> {
    vec![
        status.as_str().to_string(),
        now.to_string(),
        flag(update.result_ref.is_some()).to_string(),
        update.result_ref.clone().unwrap_or_default(),
        flag(update.error.is_some()).to_string(),
        update.error.clone().unwrap_or_default(),
    ]
}

/// ARGV for [`UPSERT_CREDENTIAL_SCRIPT`]. An absent refresh token keeps the
/// stored one; an absent expiry clears it.
fn upsert_credential_args(owner_id: &str, tokens: &TokenSet, now: &str) -> Vec<String> {
    let expiry = tokens.expiry.map(|t| t.to_rfc3339());
    vec![
        owner_id.to_string(),
        tokens.access_token.clone(),
        tokens.scope.clone(),
        tokens.token_type.clone(),
        now.to_string(),
        flag(tokens.refresh_token.is_some()).to_string(),
        tokens.refresh_token.clone().unwrap_or_default(),
        flag(expiry.is_some()).to_string(),
        expiry.unwrap_or_default(),
    ]
}

fn required<'a>(fields: &'a HashMap<String, String>, key: &str, name: &str) -> StoreResult<&'a str> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| StoreError::corrupt(key, format!("missing field '{}'", name)))
}

fn parse_time(key: &str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(key, format!("bad timestamp '{}': {}", value, e)))
}

/// Decode a job hash.
fn job_from_fields(key: &str, fields: &HashMap<String, String>) -> StoreResult<Job> {
    let status = required(fields, key, "status")?
        .parse::<JobStatus>()
        .map_err(|e| StoreError::corrupt(key, e.to_string()))?;

    Ok(Job {
        id: JobId::from_string(required(fields, key, "id")?),
        owner_id: required(fields, key, "owner_id")?.to_string(),
        source_url: required(fields, key, "source_url")?.to_string(),
        status,
        created_at: parse_time(key, required(fields, key, "created_at")?)?,
        updated_at: parse_time(key, required(fields, key, "updated_at")?)?,
        result_ref: fields.get("result_ref").cloned(),
        error: fields.get("error").cloned(),
    })
}

/// Decode a credential hash.
fn credential_from_fields(key: &str, fields: &HashMap<String, String>) -> StoreResult<CredentialRecord> {
    let expiry = match fields.get("expiry") {
        Some(value) => Some(parse_time(key, value)?),
        None => None,
    };

    Ok(CredentialRecord {
        owner_id: required(fields, key, "owner_id")?.to_string(),
        access_token: required(fields, key, "access_token")?.to_string(),
        refresh_token: fields.get("refresh_token").cloned(),
        scope: fields.get("scope").cloned().unwrap_or_default(),
        token_type: fields
            .get("token_type")
            .cloned()
            .unwrap_or_else(|| "Bearer".to_string()),
        expiry,
        updated_at: parse_time(key, required(fields, key, "updated_at")?)?,
    })
}

#[async_trait]
impl JobLedger for RedisStore {
    async fn create(
        &self,
        id: &JobId,
        owner_id: &str,
        source_url: &str,
        status: JobStatus,
    ) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let now = Utc::now().to_rfc3339();

        let created: i32 = redis::Script::new(CREATE_JOB_SCRIPT)
            .key(self.job_key(id))
            .arg(id.as_str())
            .arg(owner_id)
            .arg(source_url)
            .arg(status.as_str())
            .arg(&now)
            .invoke_async(&mut conn)
            .await?;

        if created == 0 {
            return Err(StoreError::duplicate_id(id.as_str()));
        }
        info!(job_id = %id, owner_id = %owner_id, "Created job record");
        Ok(())
    }

    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        update: StatusUpdate,
    ) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let now = Utc::now().to_rfc3339();

        let script = redis::Script::new(UPDATE_JOB_SCRIPT);
        let mut invocation = script.key(self.job_key(id));
        for arg in update_job_args(status, &update, &now) {
            invocation.arg(arg);
        }
        let updated: i32 = invocation.invoke_async(&mut conn).await?;

        if updated == 0 {
            return Err(StoreError::not_found(id.as_str()));
        }
        debug!(job_id = %id, status = %status, "Updated job status");
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.job_key(id);
        let fields: HashMap<String, String> = conn.hgetall(&key).await?;

        if fields.is_empty() {
            return Ok(None);
        }
        job_from_fields(&key, &fields).map(Some)
    }
}

#[async_trait]
impl CredentialStore for RedisStore {
    async fn upsert(&self, owner_id: &str, tokens: TokenSet) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let now = Utc::now().to_rfc3339();

        let script = redis::Script::new(UPSERT_CREDENTIAL_SCRIPT);
        let mut invocation = script.key(self.credential_key(owner_id));
        for arg in upsert_credential_args(owner_id, &tokens, &now) {
            invocation.arg(arg);
        }
        let _: i32 = invocation.invoke_async(&mut conn).await?;

        info!(owner_id = %owner_id, "Stored credential");
        Ok(())
    }

    async fn get(&self, owner_id: &str) -> StoreResult<Option<CredentialRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.credential_key(owner_id);
        let fields: HashMap<String, String> = conn.hgetall(&key).await?;

        if fields.is_empty() {
            return Ok(None);
        }
        credential_from_fields(&key, &fields).map(Some)
    }

    async fn delete(&self, owner_id: &str) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(self.credential_key(owner_id)).await?;
        info!(owner_id = %owner_id, "Deleted credential");
        Ok(())
    }
}

#[async_trait]
impl PendingAuthLedger for RedisStore {
    async fn begin(&self, owner_id: &str) -> StoreResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let token = generate_state_token();
        let payload = serde_json::to_string(&PendingAuthorization::new(&token, owner_id))?;

        let stored: Option<String> = redis::cmd("SET")
            .arg(self.state_key(&token))
            .arg(payload)
            .arg("NX")
            .arg("EX")
            .arg(self.config.oauth_state_ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        if stored.is_none() {
            return Err(StoreError::duplicate_id(token));
        }
        Ok(token)
    }

    async fn consume(&self, state_token: &str) -> StoreResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // GETDEL is atomic: concurrent callbacks with the same token cannot both see it.
        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(self.state_key(state_token))
            .query_async(&mut conn)
            .await?;

        match payload {
            Some(raw) => {
                let pending: PendingAuthorization = serde_json::from_str(&raw)?;
                Ok(Some(pending.owner_id))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_fields() -> HashMap<String, String> {
        let now = "2026-01-02T03:04:05+00:00".to_string();
        HashMap::from([
            ("id".to_string(), "job-1".to_string()),
            ("owner_id".to_string(), "u1".to_string()),
            ("source_url".to_string(), "https://video/x".to_string()),
            ("status".to_string(), "transcribing".to_string()),
            ("created_at".to_string(), now.clone()),
            ("updated_at".to_string(), now),
        ])
    }

    #[test]
    fn test_job_from_fields() {
        let mut fields = job_fields();
        fields.insert("error".to_string(), "boom".to_string());

        let job = job_from_fields("sclip:job:job-1", &fields).unwrap();
        assert_eq!(job.id.as_str(), "job-1");
        assert_eq!(job.status, JobStatus::Transcribing);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.result_ref.is_none());
    }

    #[test]
    fn test_job_from_fields_rejects_unknown_status() {
        let mut fields = job_fields();
        fields.insert("status".to_string(), "paused".to_string());
        let err = job_from_fields("k", &fields).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_credential_without_refresh_token() {
        let fields = HashMap::from([
            ("owner_id".to_string(), "u1".to_string()),
            ("access_token".to_string(), "a".to_string()),
            ("updated_at".to_string(), "2026-01-02T03:04:05Z".to_string()),
        ]);
        let record = credential_from_fields("k", &fields).unwrap();
        assert_eq!(record.token_type, "Bearer");
        assert!(record.refresh_token.is_none());
        assert!(record.expiry.is_none());
    }

    #[test]
    fn test_update_args_keep_result_ref_and_clear_error() {
        let now = "2026-01-02T03:04:05+00:00";

        let args = update_job_args(JobStatus::Uploading, &StatusUpdate::default(), now);
        assert_eq!(args, ["uploading", now, "0", "", "0", ""]);

        let done = StatusUpdate {
            result_ref: Some("yt-1".to_string()),
            ..Default::default()
        };
        let args = update_job_args(JobStatus::Completed, &done, now);
        assert_eq!(args, ["completed", now, "1", "yt-1", "0", ""]);

        let failed = StatusUpdate {
            error: Some("boom".to_string()),
            ..Default::default()
        };
        let args = update_job_args(JobStatus::Failed, &failed, now);
        assert_eq!(&args[2..], ["0", "", "1", "boom"]);
    }

    #[test]
    fn test_upsert_args_merge_refresh_token() {
        let now = "2026-01-02T03:04:05+00:00";

        let args = upsert_credential_args("u1", &TokenSet::bearer("a"), now);
        assert_eq!(args[0], "u1");
        assert_eq!(args[1], "a");
        assert_eq!(args[3], "Bearer");
        assert_eq!(&args[5..], ["0", "", "0", ""]);

        let expiry: DateTime<Utc> = "2026-01-02T04:04:05Z".parse().unwrap();
        let tokens = TokenSet::bearer("b")
            .with_refresh_token("r-1")
            .with_expiry(expiry);
        let stamp = expiry.to_rfc3339();
        let args = upsert_credential_args("u1", &tokens, now);
        assert_eq!(&args[5..], ["1", "r-1", "1", stamp.as_str()]);
    }

    #[test]
    fn test_key_layout() {
        let store = RedisStore::new(StoreConfig::default()).unwrap();
        assert_eq!(store.job_key(&JobId::from("j1")), "sclip:job:j1");
        assert_eq!(store.credential_key("u1"), "sclip:credential:u1");
        assert_eq!(store.state_key("t"), "sclip:oauth_state:t");
    }
}
