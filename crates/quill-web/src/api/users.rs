use axum::extract::State;
use axum::Json;
use quill_core::{Profile, ProfileUpdate, User};

use crate::auth::CurrentSession;
use crate::dto::{FollowRequest, FollowResponse};
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

async fn current_user(state: &AppState, session: &CurrentSession) -> Result<User, AppError> {
    let identity = session.require()?;
    state
        .store
        .find_user_by_email(&identity.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn get_me(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(current_user(&state, &session).await?.profile()))
}

pub async fn update_me(
    State(state): State<AppState>,
    session: CurrentSession,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    let mut user = current_user(&state, &session).await?;
    update.apply(&mut user);
    let user = state
        .store
        .update_user(user)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user.profile()))
}

/// Toggles whether the caller follows `target`.
pub async fn follow(
    State(state): State<AppState>,
    session: CurrentSession,
    ApiJson(body): ApiJson<FollowRequest>,
) -> Result<Json<FollowResponse>, AppError> {
    session.require()?;
    let target = body
        .target
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing target".to_string()))?;

    let mut user = current_user(&state, &session).await?;
    if user.email == target {
        return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
    }

    let now_following = user.toggle_follow(&target);
    let user = state
        .store
        .update_user(user)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(FollowResponse {
        following: user.following,
        status: if now_following { "followed" } else { "unfollowed" },
    }))
}
