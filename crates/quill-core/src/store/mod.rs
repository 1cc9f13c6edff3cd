//! Persistence boundary.
//!
//! Route handlers only talk to a [`Store`]. Lookups that find nothing return
//! `Ok(None)`; `Err` is reserved for failures of the backing store itself
//! and for constraint violations ([`CoreError::Conflict`](crate::CoreError::Conflict)).

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::model::{Comment, Page, PasswordReset, Post, PostQuery, User};

pub use memory::MemoryStore;

#[async_trait]
pub trait Store: Send + Sync {
    // --- users ---

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> CoreResult<Option<User>>;

    /// Fails with [`CoreError::Conflict`](crate::CoreError::Conflict) when the email is taken.
    async fn insert_user(&self, user: User) -> CoreResult<User>;

    /// Replaces the stored user with the same id. `None` if it vanished.
    async fn update_user(&self, user: User) -> CoreResult<Option<User>>;

    // --- posts ---

    async fn find_post(&self, id: Uuid) -> CoreResult<Option<Post>>;

    async fn find_post_by_slug(&self, slug: &str) -> CoreResult<Option<Post>>;

    /// Newest first.
    async fn list_posts(&self, query: &PostQuery) -> CoreResult<Page<Post>>;

    /// Fails with [`CoreError::Conflict`](crate::CoreError::Conflict) when the slug is taken.
    async fn insert_post(&self, post: Post) -> CoreResult<Post>;

    async fn update_post(&self, post: Post) -> CoreResult<Option<Post>>;

    /// Removes the post and its comments. Returns whether it existed.
    async fn delete_post(&self, id: Uuid) -> CoreResult<bool>;

    /// Adds one clap and returns the new total, or `None` if the post is gone.
    async fn increment_claps(&self, id: Uuid) -> CoreResult<Option<u64>>;

    // --- comments ---

    async fn find_comment(&self, id: Uuid) -> CoreResult<Option<Comment>>;

    /// Oldest first, optionally restricted to one post.
    async fn list_comments(&self, post_id: Option<Uuid>) -> CoreResult<Vec<Comment>>;

    async fn insert_comment(&self, comment: Comment) -> CoreResult<Comment>;

    async fn delete_comment(&self, id: Uuid) -> CoreResult<bool>;

    // --- password resets ---

    async fn insert_reset(&self, reset: PasswordReset) -> CoreResult<()>;

    /// Marks the unused, unexpired reset whose digest equals `token_hash` as
    /// used and returns it. The check and the update are one atomic step, so
    /// a token is handed out at most once.
    async fn take_active_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<PasswordReset>>;
}

/// Looks a post up by id when `reference` parses as a UUID, falling back to
/// the slug, which may itself be UUID-shaped.
pub async fn find_post_ref(store: &dyn Store, reference: &str) -> CoreResult<Option<Post>> {
    if let Ok(id) = Uuid::parse_str(reference) {
        if let Some(post) = store.find_post(id).await? {
            return Ok(Some(post));
        }
    }
    store.find_post_by_slug(reference).await
}
