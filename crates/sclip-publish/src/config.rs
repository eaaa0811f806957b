//! OAuth client configuration.

use crate::error::{PublishError, PublishResult};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Upload plus caption management.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube.force-ssl",
];

/// Path the provider redirects back to.
pub const CALLBACK_PATH: &str = "/oauth/callback";

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Public base URL of this service
    pub redirect_base: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_base: "http://localhost:8000".to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Load from environment. Client id and secret are required.
    pub fn from_env() -> PublishResult<Self> {
        let client_id = required_env("GOOGLE_CLIENT_ID")?;
        let client_secret = required_env("GOOGLE_CLIENT_SECRET")?;
        let mut config = Self::new(client_id, client_secret);

        if let Ok(base) = std::env::var("OAUTH_REDIRECT_BASE") {
            config.redirect_base = base;
        }
        if let Ok(scopes) = std::env::var("OAUTH_SCOPES") {
            let scopes: Vec<String> = scopes
                .split([',', ' '])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !scopes.is_empty() {
                config.scopes = scopes;
            }
        }
        Ok(config)
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.redirect_base.trim_end_matches('/'), CALLBACK_PATH)
    }

    pub fn with_redirect_base(mut self, base: impl Into<String>) -> Self {
        self.redirect_base = base.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

fn required_env(name: &str) -> PublishResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PublishError::config(format!("{} is not set", name)))
}
