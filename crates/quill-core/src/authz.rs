//! Request authorization guard.
//!
//! Every mutating route runs the same three-state decision:
//!
//! ```text
//! Start -> session? --no--> Unauthorized
//!             |
//!            yes -> owner check (if any) --mismatch--> Forbidden
//!                                          |
//!                                        match / none -> Allowed
//! ```
//!
//! Resource existence is the caller's job and must be checked between the
//! session step and the ownership step, so a missing record surfaces as
//! `NotFound` rather than `Forbidden`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The authenticated caller, as resolved by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub email: String,
    pub name: String,
}

impl SessionIdentity {
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    /// Display name, falling back to the email when no name was recorded.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Outcome of [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Unauthorized,
    Forbidden,
}

impl AuthDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == AuthDecision::Allowed
    }

    pub fn into_result(self) -> CoreResult<()> {
        match self {
            AuthDecision::Allowed => Ok(()),
            AuthDecision::Unauthorized => Err(CoreError::Unauthorized),
            AuthDecision::Forbidden => Err(CoreError::Forbidden),
        }
    }
}

/// Decide whether `session` may act on a resource owned by `owner`.
///
/// Pass `owner = None` for actions that only need an authenticated caller.
#[must_use]
pub fn authorize(session: Option<&SessionIdentity>, owner: Option<&str>) -> AuthDecision {
    let Some(session) = session else {
        return AuthDecision::Unauthorized;
    };
    match owner {
        Some(owner) if owner != session.email => AuthDecision::Forbidden,
        _ => AuthDecision::Allowed,
    }
}

/// Session step of the guard: returns the identity or `Unauthorized`.
pub fn require_session(session: Option<&SessionIdentity>) -> CoreResult<&SessionIdentity> {
    session.ok_or(CoreError::Unauthorized)
}

/// Ownership step of the guard for an already-fetched resource.
pub fn require_owner(session: &SessionIdentity, owner_email: &str) -> CoreResult<()> {
    let decision = authorize(Some(session), Some(owner_email));
    if decision == AuthDecision::Forbidden {
        tracing::warn!(
            caller = %session.email,
            owner = %owner_email,
            "ownership check failed"
        );
    }
    decision.into_result()
}
