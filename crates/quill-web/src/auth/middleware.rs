use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use quill_core::{require_session, SessionIdentity};

use crate::error::AppError;
use crate::state::AppState;

/// The caller's session, if the request carries a valid bearer token.
///
/// Extraction never fails: missing, malformed, expired and revoked tokens
/// all resolve to "no session", and the handler's guard turns that into a
/// 401 before touching the store.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    identity: Option<SessionIdentity>,
}

impl CurrentSession {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    /// Session step of the authorization guard.
    pub fn require(&self) -> Result<&SessionIdentity, AppError> {
        require_session(self.identity()).map_err(AppError::from)
    }

    fn resolve(headers: &HeaderMap, state: &AppState) -> Self {
        let Some(token) = bearer_token(headers) else {
            return Self::anonymous();
        };

        let claims = match super::jwt::verify_token(&state.config.auth.jwt_secret, token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Rejected session token: {e}");
                return Self::anonymous();
            }
        };

        if state.revoked_tokens.is_revoked(&claims.jti) {
            tracing::debug!("Rejected revoked token: jti={}", claims.jti);
            return Self::anonymous();
        }

        Self {
            identity: Some(claims.identity()),
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(&parts.headers, state))
    }
}
