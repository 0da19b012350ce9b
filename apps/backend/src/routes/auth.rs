//! Identity middleware
//!
//! Identity is an opaque user id supplied by the client, with no
//! cryptographic session behind it.

use axum::{
    body::Body,
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::AppState;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

const MAX_USER_ID_LEN: usize = 128;

/// Authenticated user info stored in request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct IdentityQuery {
    user_id: Option<String>,
}

/// Pick the user id from the header, else the query string.
pub fn resolve_user_id(header: Option<&str>, query: Option<&str>) -> Result<String> {
    let raw = header
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| query.map(str::trim).filter(|v| !v.is_empty()))
        .ok_or_else(|| ApiError::Unauthorized("Missing user id".to_string()))?;

    if raw.chars().count() > MAX_USER_ID_LEN || raw.chars().any(char::is_control) {
        return Err(ApiError::Unauthorized("Invalid user id".to_string()));
    }

    Ok(raw.to_string())
}

/// Auth middleware - resolves the caller and creates the user row lazily
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let header = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let query = Query::<IdentityQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.user_id);

    let user_id = resolve_user_id(header.as_deref(), query.as_deref())?;

    state.db.touch_user(&user_id).await?;

    // Store authenticated user in request extensions
    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_wins_over_query() {
        let id = resolve_user_id(Some("alice"), Some("bob")).unwrap();
        assert_eq!(id, "alice");
    }

    #[test]
    fn test_query_fallback() {
        let id = resolve_user_id(None, Some(" bob ")).unwrap();
        assert_eq!(id, "bob");
    }

    #[test]
    fn test_blank_header_falls_back_to_query() {
        let id = resolve_user_id(Some("   "), Some("bob")).unwrap();
        assert_eq!(id, "bob");
    }

    #[test]
    fn test_missing_identity_is_unauthorized() {
        let err = resolve_user_id(None, None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_oversized_identity_is_unauthorized() {
        let long = "x".repeat(MAX_USER_ID_LEN + 1);
        let err = resolve_user_id(Some(&long), None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
