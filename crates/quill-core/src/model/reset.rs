//! Password reset tokens.
//!
//! Only the SHA-256 digest of a token is stored. The raw token is handed to
//! the requester once and compared by digest on confirmation.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordReset {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Hex SHA-256 of the raw token.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    #[must_use]
    pub fn new(user_id: Uuid, token: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_token(token),
            expires_at: now + ttl,
            used: false,
            created_at: now,
        }
    }

    /// Unused and not yet expired at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Hex SHA-256 digest of a reset token.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
