//! Durable state for the ShortClip backend.
//!
//! This crate provides:
//! - Job ledger, credential store and pending-authorization ledger traits
//! - A Redis implementation with per-key atomic writes
//! - An in-memory implementation for tests and local runs
//! - Progress events via Redis Pub/Sub

pub mod config;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod progress;
pub mod redis_store;
pub mod token;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use ledger::{CredentialStore, JobLedger, PendingAuthLedger};
pub use memory::MemoryStore;
pub use progress::{ProgressChannel, ProgressEvent};
pub use redis_store::RedisStore;
pub use token::generate_state_token;
