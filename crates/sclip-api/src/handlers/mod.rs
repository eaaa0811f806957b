//! API request handlers.

pub mod auth;
pub mod health;
pub mod jobs;

pub use health::{health, ready};
