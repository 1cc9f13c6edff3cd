use axum::extract::State;
use axum::Json;
use quill_core::find_post_ref;

use crate::auth::CurrentSession;
use crate::dto::{ClapRequest, ClapResponse};
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn clap(
    State(state): State<AppState>,
    session: CurrentSession,
    ApiJson(body): ApiJson<ClapRequest>,
) -> Result<Json<ClapResponse>, AppError> {
    session.require()?;
    let reference = body
        .post_id
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing postId".to_string()))?;

    let not_found = || AppError::NotFound("Post not found".to_string());
    let post = find_post_ref(state.store.as_ref(), &reference)
        .await?
        .ok_or_else(not_found)?;
    let claps = state
        .store
        .increment_claps(post.id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ClapResponse { claps }))
}
