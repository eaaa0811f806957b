//! Clip job orchestration.
//!
//! [`JobRunner`] moves one job through the fixed stage sequence and writes
//! every transition to the job ledger. [`JobExecutor`] runs submitted jobs
//! in the background with bounded concurrency and cooperative cancellation.

pub mod adapters;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod notifier;
pub mod runner;

pub use collaborators::{
    AudioExtractor, Authorizer, ClipFormatter, Collaborators, Downloader, StageError,
    StageResult, Transcriber, Uploader,
};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult, LINK_ACCOUNT_MESSAGE};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use notifier::{
    ChannelNotifier, FanoutNotifier, LogNotifier, NoopNotifier, Notifier, NotifyError,
    ProgressNotifier, WebhookNotifier,
};
pub use runner::JobRunner;
