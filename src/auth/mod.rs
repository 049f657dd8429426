//! Authentication: the session ledger, and the per-request gate that turns a
//! bearer token into a [`Principal`].

mod gate;
mod sessions;

pub use gate::{authenticate, extract_token, AuthError, TOKEN_COOKIE};
pub use sessions::{Session, SessionLedger};

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppError;

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers);

        match authenticate(&state.sessions, &state.jwt, token.as_deref()).await {
            Ok(principal) => Ok(principal),
            Err(err) => {
                tracing::warn!(reason = %err, path = %parts.uri.path(), "request rejected by auth gate");
                Err(err.into())
            }
        }
    }
}
