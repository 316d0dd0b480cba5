//! Shared-secret check in front of the site administration routes

use axum::{
    extract::{Request, State},
    http::header::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Middleware that rejects requests without the configured admin token.
///
/// With no token configured every admin request is refused.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    check_admin_token(request.headers(), state.config.admin_token.as_deref())?;
    Ok(next.run(request).await)
}

pub fn check_admin_token(headers: &HeaderMap, expected: Option<&str>) -> ServerResult<()> {
    let Some(expected) = expected.filter(|t| !t.is_empty()) else {
        tracing::warn!("admin request refused, no admin_token configured");
        return Err(ServerError::Unauthorized("Admin access is disabled".into()));
    };
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::Unauthorized("Missing X-Admin-Token header".into()))?;

    // blake3::Hash compares in constant time
    if blake3::hash(presented.as_bytes()) != blake3::hash(expected.as_bytes()) {
        return Err(ServerError::Unauthorized("Invalid X-Admin-Token header".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_token(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_TOKEN_HEADER, HeaderValue::from_str(token).unwrap());
        headers
    }

    #[test]
    fn test_admin_token() {
        assert!(check_admin_token(&with_token("s3cret"), Some("s3cret")).is_ok());
        assert!(matches!(
            check_admin_token(&with_token("guess"), Some("s3cret")),
            Err(ServerError::Unauthorized(_))
        ));
        assert!(matches!(
            check_admin_token(&HeaderMap::new(), Some("s3cret")),
            Err(ServerError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_no_token_configured_refuses() {
        assert!(check_admin_token(&with_token(""), None).is_err());
        assert!(check_admin_token(&with_token(""), Some("")).is_err());
    }
}
