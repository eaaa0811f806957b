//! Account linking and publishing for ShortClip.
//!
//! - [`OAuthClient`]: consent URL, code exchange and token refresh
//! - [`CredentialAuthorizer`]: stored credential to bearer client, refreshing when stale
//! - [`YouTubeUploader`]: resumable video upload plus caption track

pub mod authorizer;
pub mod config;
pub mod error;
pub mod oauth;
pub mod youtube;

pub use authorizer::{AuthorizedClient, CredentialAuthorizer};
pub use config::OAuthConfig;
pub use error::{PublishError, PublishResult};
pub use oauth::{OAuthClient, TokenResponse};
pub use youtube::{VideoMetadata, YouTubeUploader};
