use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use quill_core::{
    authorize, find_post_ref, require_owner, NewPost, Post, PostQuery, PostUpdate, SessionIdentity,
};

use crate::auth::CurrentSession;
use crate::dto::{OkResponse, PostIdQuery, PostListParams, PostListResponse};
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Runs the full guard for a mutation of the post named by `reference`:
/// session, then existence, then ownership.
async fn owned_post<'s>(
    state: &AppState,
    session: &'s CurrentSession,
    reference: &str,
) -> Result<(&'s SessionIdentity, Post), AppError> {
    let identity = session.require()?;
    let post = find_post_ref(state.store.as_ref(), reference)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;
    require_owner(identity, &post.author_email)?;
    Ok((identity, post))
}

pub async fn list_posts(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(params): Query<PostListParams>,
) -> Result<Json<PostListResponse>, AppError> {
    let published_only = params.published.as_deref() != Some("false");

    let author_email = match params.author.as_deref() {
        Some("self") => Some(session.require()?.email.clone()),
        Some(email) if published_only => Some(email.to_string()),
        _ if !published_only => Some(session.require()?.email.clone()),
        _ => None,
    };

    let query = PostQuery {
        tag: params.tag.filter(|t| !t.is_empty()),
        search: params.q.filter(|q| !q.is_empty()),
        author_email,
        published_only,
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(10),
    };

    let page = state.store.list_posts(&query).await?;
    Ok(Json(page.into()))
}

pub async fn create_post(
    State(state): State<AppState>,
    session: CurrentSession,
    ApiJson(body): ApiJson<NewPost>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let identity = session.require()?;
    let post = body.into_post(identity, Utc::now());
    let post = state.store.insert_post(post).await?;
    tracing::info!("Post created: id={}, author={}", post.id, post.author_email);
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(reference): Path<String>,
) -> Result<Json<Post>, AppError> {
    let post = find_post_ref(state.store.as_ref(), &reference)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    // Drafts and unpublished posts are only visible to their author.
    if !post.is_public() {
        authorize(session.identity(), Some(post.author_email.as_str())).into_result()?;
    }
    Ok(Json(post))
}

async fn apply_update(
    state: &AppState,
    session: &CurrentSession,
    reference: &str,
    update: PostUpdate,
) -> Result<Json<Post>, AppError> {
    let (identity, mut post) = owned_post(state, session, reference).await?;
    update.apply(&mut post, Utc::now());
    let post = state
        .store
        .update_post(post)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;
    tracing::info!("Post updated: id={}, by={}", post.id, identity.email);
    Ok(Json(post))
}

async fn remove(
    state: &AppState,
    session: &CurrentSession,
    reference: &str,
) -> Result<Json<OkResponse>, AppError> {
    let (identity, post) = owned_post(state, session, reference).await?;
    if !state.store.delete_post(post.id).await? {
        return Err(AppError::NotFound("Not found".to_string()));
    }
    tracing::info!("Post deleted: id={}, by={}", post.id, identity.email);
    Ok(Json(OkResponse::ok()))
}

/// `PUT /posts` with the id in the body.
pub async fn update_post_by_body(
    State(state): State<AppState>,
    session: CurrentSession,
    ApiJson(update): ApiJson<PostUpdate>,
) -> Result<Json<Post>, AppError> {
    session.require()?;
    let id = update
        .id
        .ok_or_else(|| AppError::BadRequest("Missing id".to_string()))?;
    apply_update(&state, &session, &id.to_string(), update).await
}

/// `DELETE /posts?id=`.
pub async fn delete_post_by_query(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<PostIdQuery>,
) -> Result<Json<OkResponse>, AppError> {
    session.require()?;
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing id".to_string()))?;
    remove(&state, &session, &id).await
}

pub async fn update_post(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(reference): Path<String>,
    ApiJson(update): ApiJson<PostUpdate>,
) -> Result<Json<Post>, AppError> {
    apply_update(&state, &session, &reference, update).await
}

pub async fn delete_post(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(reference): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    remove(&state, &session, &reference).await
}
