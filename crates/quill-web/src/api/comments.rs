use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use quill_core::{find_post_ref, require_owner, Comment, NewComment};
use uuid::Uuid;

use crate::auth::CurrentSession;
use crate::dto::{CommentListQuery, OkResponse};
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentListQuery>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let post_id = match query.post_id.as_deref().filter(|r| !r.is_empty()) {
        Some(reference) => match find_post_ref(state.store.as_ref(), reference).await? {
            Some(post) => Some(post.id),
            None => return Ok(Json(Vec::new())),
        },
        None => None,
    };

    Ok(Json(state.store.list_comments(post_id).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    session: CurrentSession,
    ApiJson(body): ApiJson<NewComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let identity = session.require()?;
    if body.post_id.is_empty() || body.body.trim().is_empty() {
        return Err(AppError::BadRequest("Missing postId or body".to_string()));
    }

    let post = find_post_ref(state.store.as_ref(), &body.post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if let Some(parent_id) = body.parent_id {
        let parent = state.store.find_comment(parent_id).await?;
        if parent.map_or(true, |p| p.post_id != post.id) {
            return Err(AppError::BadRequest("Invalid parentId".to_string()));
        }
    }

    let comment = Comment::new(post.id, identity, body.body, body.parent_id, Utc::now());
    let comment = state.store.insert_comment(comment).await?;
    tracing::info!("Comment created: id={}, post={}", comment.id, post.id);
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    let identity = session.require()?;

    let not_found = || AppError::NotFound("Not found".to_string());
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let comment = state.store.find_comment(id).await?.ok_or_else(not_found)?;

    require_owner(identity, &comment.author_email)?;

    if !state.store.delete_comment(id).await? {
        return Err(not_found());
    }
    tracing::info!("Comment deleted: id={id}, by={}", identity.email);
    Ok(Json(OkResponse::ok()))
}
