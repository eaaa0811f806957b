//! Redis ledger integration tests.

use std::time::Duration;

use futures_util::StreamExt;
use sclip_models::{JobId, JobStatus, StatusUpdate, TokenSet};
use sclip_store::{
    CredentialStore, JobLedger, PendingAuthLedger, ProgressChannel, ProgressEvent, RedisStore,
    StoreConfig, StoreError,
};

fn test_store() -> RedisStore {
    dotenvy::dotenv().ok();
    let config = StoreConfig {
        key_prefix: format!("sclip-test-{}", uuid_suffix()),
        ..StoreConfig::from_env()
    };
    RedisStore::new(config).expect("Failed to create store")
}

fn uuid_suffix() -> String {
    JobId::new().as_str()[..8].to_string()
}

/// Test job create / update / get against a live server.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_job_ledger_roundtrip() {
    let store = test_store();
    store.ping().await.expect("Redis not reachable");

    let id = JobId::new();
    store
        .create(&id, "u1", "https://video/x", JobStatus::Queued)
        .await
        .expect("Failed to create job");

    let err = store
        .create(&id, "u1", "https://video/x", JobStatus::Queued)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId(_)));

    store
        .update_status(&id, JobStatus::Downloading, StatusUpdate::failed("stale"))
        .await
        .unwrap();
    store
        .update_status(&id, JobStatus::Completed, StatusUpdate::completed("yt-123"))
        .await
        .unwrap();
    store
        .update_status(&id, JobStatus::Completed, StatusUpdate::none())
        .await
        .unwrap();

    let job = JobLedger::get(&store, &id).await.unwrap().expect("job missing");
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result_ref.as_deref(), Some("yt-123"));
    assert_eq!(job.error, None);
}

/// Test the sticky refresh token against a live server.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_credential_upsert_and_delete() {
    let store = test_store();

    store
        .upsert("owner-a", TokenSet::bearer("a1").with_refresh_token("r1"))
        .await
        .unwrap();
    store.upsert("owner-a", TokenSet::bearer("a2")).await.unwrap();

    let record = CredentialStore::get(&store, "owner-a").await.unwrap().unwrap();
    assert_eq!(record.access_token, "a2");
    assert_eq!(record.refresh_token.as_deref(), Some("r1"));

    store.delete("owner-a").await.unwrap();
    assert!(CredentialStore::get(&store, "owner-a").await.unwrap().is_none());
}

/// Test single-use state tokens against a live server.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_state_token_single_use() {
    let store = test_store();

    let token = store.begin("owner-b").await.unwrap();
    assert_eq!(store.consume(&token).await.unwrap().as_deref(), Some("owner-b"));
    assert_eq!(store.consume(&token).await.unwrap(), None);
}

/// Test progress publish/subscribe.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_progress_pubsub() {
    let store = test_store();
    let channel = ProgressChannel::from_client(store.client().clone(), "sclip-test");
    let job_id = JobId::new();

    let mut stream = channel.subscribe(&job_id).await.unwrap();
    let event = ProgressEvent {
        job_id: job_id.clone(),
        owner_id: "u1".to_string(),
        status: "downloading".to_string(),
    };
    channel.publish(&event).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out")
        .expect("stream closed");
    assert_eq!(received, event);
}
