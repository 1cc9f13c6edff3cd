use dashmap::DashMap;

/// Token ids invalidated by logout, each kept until the token would have
/// expired on its own.
#[derive(Default)]
pub struct RevocationList {
    revoked: DashMap<String, u64>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes `jti` until `expires_at` (unix seconds).
    pub fn revoke(&self, jti: String, expires_at: u64) {
        tracing::debug!("Token revoked: jti={jti}");
        self.revoked.insert(jti, expires_at);
        tracing::debug!("Revocation list size: {}", self.revoked.len());
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }

    /// Drops entries for tokens that have expired anyway.
    pub fn cleanup_expired(&self, now_secs: u64) -> usize {
        let before = self.revoked.len();
        self.revoked.retain(|_, expires_at| *expires_at > now_secs);
        before.saturating_sub(self.revoked.len())
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}
