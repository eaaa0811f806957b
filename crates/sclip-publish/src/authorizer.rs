//! Credential-backed authorization for uploads.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use sclip_store::CredentialStore;

use crate::oauth::OAuthClient;

/// Access tokens this close to expiry are refreshed first.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Bearer credentials ready for platform API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedClient {
    pub owner_id: String,
    pub access_token: String,
    pub token_type: String,
}

impl AuthorizedClient {
    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Resolves an owner to an [`AuthorizedClient`], refreshing expired tokens.
///
/// Never errors: every failure path is logged and reported as absence.
#[derive(Clone)]
pub struct CredentialAuthorizer {
    store: Arc<dyn CredentialStore>,
    oauth: OAuthClient,
}

impl CredentialAuthorizer {
    pub fn new(store: Arc<dyn CredentialStore>, oauth: OAuthClient) -> Self {
        Self { store, oauth }
    }

    pub async fn authorize(&self, owner_id: &str) -> Option<AuthorizedClient> {
        let record = match self.store.get(owner_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(owner_id, "No linked account");
                return None;
            }
            Err(e) => {
                warn!(owner_id, error = %e, "Failed to load credential");
                return None;
            }
        };

        let skew = chrono::Duration::seconds(EXPIRY_SKEW_SECS);
        if !record.is_expired_at(Utc::now(), skew) {
            return Some(AuthorizedClient {
                owner_id: record.owner_id,
                access_token: record.access_token,
                token_type: record.token_type,
            });
        }

        let Some(refresh_token) = record.refresh_token.as_deref() else {
            warn!(owner_id, "Access token expired and no refresh token is stored");
            return None;
        };

        let mut tokens = match self.oauth.refresh(refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(owner_id, error = %e, "Token refresh failed");
                return None;
            }
        };
        if tokens.scope.is_empty() {
            tokens.scope = record.scope.clone();
        }

        let client = AuthorizedClient {
            owner_id: owner_id.to_string(),
            access_token: tokens.access_token.clone(),
            token_type: tokens.token_type.clone(),
        };

        // The fresh token is still usable for this job if persisting fails
        if let Err(e) = self.store.upsert(owner_id, tokens).await {
            warn!(owner_id, error = %e, "Failed to persist refreshed token");
        } else {
            info!(owner_id, "Refreshed access token");
        }

        Some(client)
    }
}
