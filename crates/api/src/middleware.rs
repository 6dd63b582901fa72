use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use taskboard_auth::JwtValidator;
use taskboard_infra::DynStore;

use crate::app::errors::ApiError;
use crate::context::{PrincipalContext, SessionToken};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub store: DynStore,
}

/// Authenticate the bearer token and attach a [`PrincipalContext`].
///
/// Rejects with 401 when the token is missing, invalid, expired, revoked, or
/// belongs to an account that no longer exists.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers()).ok_or(ApiError::Unauthenticated)?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::Unauthenticated
    })?;
    let user_id = claims.subject().map_err(|_| ApiError::Unauthenticated)?;

    if state.store.is_token_revoked(claims.jti).await? {
        return Err(ApiError::Unauthenticated);
    }

    let account = state
        .store
        .get_user(user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(PrincipalContext::new(
        account,
        SessionToken {
            jti: claims.jti,
            expires_at: claims.expires_at,
        },
    ));

    Ok(next.run(req).await)
}

/// First `Authorization` header, `Bearer` scheme in any case, non-empty token.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?.trim();

    let (scheme, token) = header.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::AUTHORIZATION;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn scheme_is_case_insensitive_and_whitespace_tolerant() {
        assert_eq!(extract_bearer(&headers(&["Bearer abc"])), Some("abc"));
        assert_eq!(extract_bearer(&headers(&["bearer abc"])), Some("abc"));
        assert_eq!(extract_bearer(&headers(&["  BEARER   abc  "])), Some("abc"));
    }

    #[test]
    fn rejects_missing_empty_or_foreign_schemes() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
        assert_eq!(extract_bearer(&headers(&["Bearer"])), None);
        assert_eq!(extract_bearer(&headers(&["Bearer    "])), None);
        assert_eq!(extract_bearer(&headers(&["Basic dXNlcjpwYXNz"])), None);
    }

    #[test]
    fn only_first_header_counts() {
        assert_eq!(
            extract_bearer(&headers(&["Bearer first", "Bearer second"])),
            Some("first")
        );
    }
}
