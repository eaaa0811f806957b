//! Request input checks.

use url::Url;

use crate::error::{ApiError, ApiResult};

const MAX_URL_LENGTH: usize = 2048;
const MAX_OWNER_ID_LENGTH: usize = 128;

/// Accept only absolute http(s) URLs with a host.
pub fn validate_source_url(raw: &str) -> ApiResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::bad_request("source_url is required"));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(ApiError::bad_request("source_url is too long"));
    }

    let parsed = Url::parse(raw).map_err(|_| ApiError::bad_request("source_url is not a valid URL"))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ApiError::bad_request(format!(
                "unsupported URL scheme '{}': only http and https are accepted",
                other
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ApiError::bad_request("source_url has no host"));
    }

    Ok(raw.to_string())
}

/// Owner ids come from the chat front end and end up in Redis keys.
pub fn validate_owner_id(raw: &str) -> ApiResult<String> {
    let owner = raw.trim();
    if owner.is_empty() {
        return Err(ApiError::bad_request("owner_id is required"));
    }
    if owner.len() > MAX_OWNER_ID_LENGTH {
        return Err(ApiError::bad_request("owner_id is too long"));
    }
    if !owner
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
    {
        return Err(ApiError::bad_request("owner_id contains invalid characters"));
    }
    Ok(owner.to_string())
}
