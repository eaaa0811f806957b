//! OAuth 2.0 authorization-code flow against the provider.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use sclip_models::TokenSet;

use crate::config::OAuthConfig;
use crate::error::{PublishError, PublishResult};

/// Token endpoint response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn into_token_set(self) -> TokenSet {
        let mut tokens = TokenSet::bearer(self.access_token);
        tokens.refresh_token = self.refresh_token;
        if let Some(scope) = self.scope {
            tokens.scope = scope;
        }
        if let Some(token_type) = self.token_type {
            tokens.token_type = token_type;
        }
        tokens.expiry = self.expires_in.and_then(|secs| expiry_after(Utc::now(), secs));
        tokens
    }
}

/// Absolute expiry for a relative lifetime. Negative lifetimes mean already
/// expired; lifetimes past chrono's range mean no known expiry.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    chrono::Duration::try_seconds(secs.max(0)).and_then(|lifetime| now.checked_add_signed(lifetime))
}

/// Client for the provider's consent and token endpoints.
#[derive(Clone)]
pub struct OAuthClient {
    http: Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> PublishResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(PublishError::Network)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Consent page URL carrying `state`.
    ///
    /// Offline access with a forced consent prompt so the provider issues a
    /// refresh token.
    pub fn consent_url(&self, state: &str) -> PublishResult<String> {
        let mut url = Url::parse(&self.config.auth_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri())
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> PublishResult<TokenSet> {
        let redirect_uri = self.config.redirect_uri();
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        debug!("Exchanging authorization code");
        self.token_request(&params).await
    }

    /// Obtain a fresh access token. The response usually omits the refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> PublishResult<TokenSet> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        debug!("Refreshing access token");
        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> PublishResult<TokenSet> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Token endpoint rejected request");
            return Err(PublishError::TokenEndpoint { status, body });
        }

        let body: TokenResponse = response.json().await?;
        Ok(body.into_token_set())
    }
}
