//! Shared data models for the ShortClip backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and the stage state machine
//! - OAuth credential records
//! - Pending account-linking authorizations
//! - Observer status payloads

pub mod credential;
pub mod event;
pub mod job;
pub mod pending;

// Re-export common types
pub use credential::{CredentialRecord, TokenSet};
pub use event::JobEvent;
pub use job::{Job, JobId, JobProgress, JobStatus, StatusUpdate, TransitionError, UnknownStatus};
pub use pending::PendingAuthorization;
