use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use chrono::Utc;

use super::sessions::SessionLedger;
use crate::authz::Principal;
use crate::errors::AppError;
use crate::jwt::JwtConfig;

/// Name of the cookie carrying the bearer token.
pub const TOKEN_COOKIE: &str = "token";

/// Why a request could not be authenticated.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("no token provided")]
    NoCredential,
    #[error("invalid or expired session")]
    SessionInvalid,
    #[error("invalid token")]
    TokenInvalid,
    #[error("session lookup failed")]
    Store(#[source] AppError),
}

/// Pulls the bearer token from the `token` cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(|value| value.trim().to_string())
        })
        .filter(|token| !token.is_empty())
}

/// Establishes the principal behind a bearer token.
///
/// Both the ledger and the signature must agree the token is live. The
/// principal comes from the verified payload, so a role changed after
/// issuance only takes effect once the user signs in again.
pub async fn authenticate(
    ledger: &SessionLedger,
    codec: &JwtConfig,
    token: Option<&str>,
) -> Result<Principal, AuthError> {
    let token = token.ok_or(AuthError::NoCredential)?;

    let session = ledger.find(token).await.map_err(AuthError::Store)?;
    match session {
        Some(session) if !session.is_expired_at(Utc::now()) => {}
        _ => return Err(AuthError::SessionInvalid),
    }

    let claims = codec.decode(token).map_err(|err| {
        tracing::debug!(error = %err, "token verification failed");
        AuthError::TokenInvalid
    })?;

    Ok(Principal::new(claims.sub, claims.email, claims.role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_token_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=abc.def.ghi; lang=en"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn falls_back_to_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn cookie_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token="));
        assert_eq!(extract_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn similarly_named_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("csrf_token=nope"));
        assert_eq!(extract_token(&headers), None);
    }
}
