//! Axum HTTP API for ShortClip.
//!
//! This crate provides:
//! - Job submission, polling and cancellation
//! - YouTube account linking (consent redirect, OAuth callback, unlink)
//! - Health, readiness and Prometheus metrics endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
