//! Quill HTTP service.
//!
//! A thin axum layer over `quill-core`: each route resolves the caller's
//! session from a bearer token, runs the authorization guard, consults the
//! rate limiter where the route is sensitive, and only then talks to the
//! store.

pub mod api;
pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod state;

use std::time::Duration;

use axum::http::{header, Method};
use axum::middleware::from_fn_with_state;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    // No allowed origins are configured, so browsers only reach the API same-origin.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", api::auth_router().merge(api::content_router()))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::security_headers::security_headers,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically prunes expired rate-limit buckets and revoked token ids.
pub fn spawn_maintenance(state: &AppState) -> JoinHandle<()> {
    let limiter = state.rate_limiter.clone();
    let revoked = state.revoked_tokens.clone();
    let period = Duration::from_secs(state.config.rate_limit.prune_interval_secs.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let buckets = limiter.prune_expired();
            let tokens = match auth::jwt::now_secs() {
                Ok(now) => revoked.cleanup_expired(now),
                Err(e) => {
                    tracing::warn!("Skipping revocation cleanup: {e}");
                    0
                }
            };
            if buckets > 0 || tokens > 0 {
                tracing::debug!("Pruned {buckets} rate-limit buckets, {tokens} revoked tokens");
            }
        }
    })
}
