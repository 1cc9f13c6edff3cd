use std::sync::Arc;

use quill_core::{RateLimiter, Store};

use crate::auth::session::RevocationList;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn Store>,
    /// Process-wide attempt counters for login, registration and reset.
    pub rate_limiter: Arc<RateLimiter>,
    /// Token ids revoked by logout. Tokens in this list resolve to no session.
    pub revoked_tokens: Arc<RevocationList>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<dyn Store>) -> Self {
        Self::with_rate_limiter(config, store, RateLimiter::system())
    }

    pub fn with_rate_limiter(
        config: ServerConfig,
        store: Arc<dyn Store>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            rate_limiter: Arc::new(rate_limiter),
            revoked_tokens: Arc::new(RevocationList::new()),
        }
    }
}
