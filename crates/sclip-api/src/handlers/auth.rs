//! Account linking.
//!
//! `/auth/link` parks a state token for the owner and redirects to the
//! provider's consent page. The provider calls `/oauth/callback` with that
//! token and an authorization code; the token is consumed before the code is
//! exchanged, so a replayed callback is rejected.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use crate::validation::validate_owner_id;

pub const LINKED_MESSAGE: &str =
    "Your YouTube account is linked. You can close this window and submit clips.";

#[derive(Debug, Deserialize)]
pub struct LinkParams {
    pub owner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Start linking: redirect to the consent page.
pub async fn link_account(
    State(state): State<AppState>,
    Query(params): Query<LinkParams>,
) -> ApiResult<impl IntoResponse> {
    let owner_id = validate_owner_id(&params.owner_id)?;
    let token = state.pending.begin(&owner_id).await?;
    let consent_url = state.oauth.consent_url(&token)?;

    info!(owner_id = %owner_id, "Starting account link");

    Ok((StatusCode::FOUND, [(header::LOCATION, consent_url)]))
}

/// Provider redirect target.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<impl IntoResponse> {
    let token = params
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing state parameter"))?;

    let owner_id = state
        .pending
        .consume(&token)
        .await?
        .ok_or_else(|| ApiError::not_found("unknown or expired link request"))?;

    if let Some(error) = params.error {
        warn!(owner_id = %owner_id, error = %error, "Consent was not granted");
        return Err(ApiError::bad_request(format!("authorization failed: {}", error)));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing code parameter"))?;

    let tokens = state.oauth.exchange_code(&code).await?;
    state.credentials.upsert(&owner_id, tokens).await?;

    metrics::record_account_linked();
    info!(owner_id = %owner_id, "Linked account");

    Ok((StatusCode::OK, LINKED_MESSAGE))
}

/// Forget an owner's credential.
pub async fn unlink_account(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> ApiResult<StatusCode> {
    let owner_id = validate_owner_id(&owner_id)?;
    state.credentials.delete(&owner_id).await?;
    info!(owner_id = %owner_id, "Unlinked account");
    Ok(StatusCode::NO_CONTENT)
}
