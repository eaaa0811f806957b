//! OAuth credential records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token set returned by an authorization server.
///
/// `refresh_token` is frequently omitted on renewal, which is why it is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenSet {
    /// Bearer token set with no refresh token or expiry.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            scope: String::new(),
            token_type: default_token_type(),
            expiry: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

/// Stored credential for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub owner_id: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub scope: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Build a fresh record from a token set.
    pub fn from_tokens(owner_id: impl Into<String>, tokens: TokenSet) -> Self {
        Self {
            owner_id: owner_id.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            scope: tokens.scope,
            token_type: tokens.token_type,
            expiry: tokens.expiry,
            updated_at: Utc::now(),
        }
    }

    /// Merge a newer token set; a missing refresh token keeps the stored one.
    pub fn merge(&mut self, tokens: TokenSet) {
        self.access_token = tokens.access_token;
        if let Some(refresh_token) = tokens.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.scope = tokens.scope;
        self.token_type = tokens.token_type;
        self.expiry = tokens.expiry;
        self.updated_at = Utc::now();
    }

    /// True when the access token expires within `skew` of `now`.
    ///
    /// Records without an expiry are treated as valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        match self.expiry {
            Some(expiry) => expiry - skew <= now,
            None => false,
        }
    }
}
