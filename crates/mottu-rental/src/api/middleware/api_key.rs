//! Shared-secret API key check

use crate::{api::error::ApiError, server::AppState};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Extract the API key from request headers
pub fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

/// Compare a presented key with the configured one, ignoring ASCII case
pub fn validate_api_key(presented: Option<&str>, expected: &str) -> Result<(), ApiError> {
    match presented {
        None | Some("") => Err(ApiError::MissingAuthentication {
            message: "X-API-KEY header is required".to_string(),
        }),
        Some(key) if key.eq_ignore_ascii_case(expected) => Ok(()),
        Some(_) => Err(ApiError::Authentication {
            message: "Invalid API key".to_string(),
        }),
    }
}

/// Rejects requests without the configured key; a no-op when no key is set
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.auth.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    if let Err(e) = validate_api_key(extract_api_key(req.headers()), expected) {
        warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        return Err(e);
    }

    debug!("API key accepted for {}", req.uri().path());
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_api_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);

        headers.insert("X-API-KEY", HeaderValue::from_static(" mottu-secret "));
        assert_eq!(extract_api_key(&headers), Some("mottu-secret"));
    }

    #[test]
    fn test_validate_api_key() {
        assert!(validate_api_key(Some("mottu-secret"), "mottu-secret").is_ok());
        assert!(validate_api_key(Some("MOTTU-SECRET"), "mottu-secret").is_ok());
        assert!(matches!(
            validate_api_key(None, "mottu-secret"),
            Err(ApiError::MissingAuthentication { .. })
        ));
        assert!(matches!(
            validate_api_key(Some(""), "mottu-secret"),
            Err(ApiError::MissingAuthentication { .. })
        ));
        assert!(matches!(
            validate_api_key(Some("other"), "mottu-secret"),
            Err(ApiError::Authentication { .. })
        ));
    }
}
