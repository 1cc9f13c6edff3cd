use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use quill_core::model::hash_token;
use quill_core::{PasswordReset, User};
use rand::RngCore;

use crate::auth::jwt;
use crate::auth::middleware::bearer_token;
use crate::auth::password::{self, MIN_PASSWORD_LEN};
use crate::dto::*;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::rate_limit::{enforce, ClientIp};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    client_ip: ClientIp,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let email = body.email.trim().to_string();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Email and password required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email".to_string()));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password too short".to_string()));
    }

    enforce(
        &state.rate_limiter,
        &client_ip.key("register"),
        &state.config.rate_limit.register,
        "Too many registration attempts. Please wait a minute.",
    )?;

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = password::hash_password_blocking(body.password).await?;
    let user = User::new(email, body.name, password_hash, Utc::now());
    let user = state.store.insert_user(user).await?;

    tracing::info!("Registered user: {}", user.email);
    Ok(Json(OkResponse::ok()))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = body.email.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Email and password required".to_string()));
    }

    enforce(
        &state.rate_limiter,
        &format!("login:{email}"),
        &state.config.rate_limit.login,
        "Too many login attempts. Please wait a minute.",
    )?;

    let Some(user) = state.store.find_user_by_email(email).await? else {
        tracing::warn!("Failed login attempt for unknown user: {email}");
        return Err(AppError::Unauthorized);
    };

    let valid = password::verify_password_blocking(user.password_hash.clone(), body.password).await?;
    if !valid {
        tracing::warn!("Failed login attempt for user: {email}");
        return Err(AppError::Unauthorized);
    }

    let identity = quill_core::SessionIdentity::new(user.email.clone(), user.name.clone());
    let (token, expires_at) = jwt::create_token(
        &state.config.auth.jwt_secret,
        state.config.auth.jwt_ttl_hours,
        &identity,
    )?;

    tracing::info!("Login succeeded for user: {}", user.email);
    Ok(Json(LoginResponse { token, expires_at }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<OkResponse>, AppError> {
    // Try Authorization header first
    let token = bearer_token(&headers).map(str::to_string).or_else(|| {
        // Fallback: read token from JSON body
        serde_json::from_slice::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("token")?.as_str().map(String::from))
    });

    let Some(token) = token else {
        return Ok(Json(OkResponse::ok()));
    };

    if let Ok(claims) = jwt::verify_token(&state.config.auth.jwt_secret, &token) {
        state.revoked_tokens.revoke(claims.jti.clone(), claims.exp as u64);
        tracing::info!("Token revoked for user: {} (jti: {})", claims.sub, claims.jti);
    }

    Ok(Json(OkResponse::ok()))
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn reset_request(
    State(state): State<AppState>,
    client_ip: ClientIp,
    ApiJson(body): ApiJson<ResetRequest>,
) -> Result<Json<ResetRequestResponse>, AppError> {
    let email = body.email.trim();
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".to_string()));
    }

    enforce(
        &state.rate_limiter,
        &client_ip.key("reset"),
        &state.config.rate_limit.reset,
        "Too many reset attempts. Please wait a few minutes.",
    )?;

    // Same response whether or not the account exists.
    let Some(user) = state.store.find_user_by_email(email).await? else {
        return Ok(Json(ResetRequestResponse { ok: true, token: None }));
    };

    let token = generate_reset_token();
    let ttl = chrono::Duration::minutes(state.config.auth.reset_token_ttl_minutes as i64);
    let reset = PasswordReset::new(user.id, &token, ttl, Utc::now());
    state.store.insert_reset(reset).await?;

    tracing::info!("Password reset requested for user: {}", user.email);
    let token = state.config.auth.expose_reset_token.then_some(token);
    Ok(Json(ResetRequestResponse { ok: true, token }))
}

pub async fn reset_confirm(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetConfirmRequest>,
) -> Result<Json<OkResponse>, AppError> {
    if body.token.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Token and password required".to_string()));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let invalid = || AppError::BadRequest("Invalid or expired token".to_string());

    // Consumed before the slow hash so concurrent confirms cannot both pass.
    let reset = state
        .store
        .take_active_reset(&hash_token(&body.token), Utc::now())
        .await?
        .ok_or_else(invalid)?;
    let mut user = state
        .store
        .find_user_by_id(reset.user_id)
        .await?
        .ok_or_else(invalid)?;

    user.password_hash = password::hash_password_blocking(body.password).await?;
    state.store.update_user(user).await?.ok_or_else(invalid)?;

    tracing::info!("Password reset completed: reset_id={}", reset.id);
    Ok(Json(OkResponse::ok()))
}
