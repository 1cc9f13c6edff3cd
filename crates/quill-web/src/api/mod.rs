mod auth_handlers;
mod claps;
mod comments;
mod posts;
mod users;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Registration, login and password reset. The rate-limited routes.
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/auth/reset/request", post(auth_handlers::reset_request))
        .route("/auth/reset/confirm", post(auth_handlers::reset_confirm))
}

/// Posts, comments, claps, follows and profiles. Each handler runs the
/// authorization guard itself.
pub fn content_router() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            get(posts::list_posts)
                .post(posts::create_post)
                .put(posts::update_post_by_body)
                .delete(posts::delete_post_by_query),
        )
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/claps", post(claps::clap))
        .route("/comments", get(comments::list_comments).post(comments::create_comment))
        .route("/comments/{id}", delete(comments::delete_comment))
        .route("/follow", post(users::follow))
        .route("/users/me", get(users::get_me).put(users::update_me))
}
