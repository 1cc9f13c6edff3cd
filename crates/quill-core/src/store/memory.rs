//! In-process [`Store`] over hash maps.
//!
//! Used for development and tests. Every operation takes the table lock for
//! its whole duration, so uniqueness checks and inserts cannot interleave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::{CoreError, CoreResult};
use crate::model::{Comment, Page, PasswordReset, Post, PostQuery, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    resets: HashMap<Uuid, PasswordReset>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_next: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next store call fail with [`CoreError::Store`].
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn injected_failure(&self) -> CoreResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Store("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        self.injected_failure()?;
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> CoreResult<Option<User>> {
        self.injected_failure()?;
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: User) -> CoreResult<User> {
        self.injected_failure()?;
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(CoreError::Conflict("User already exists".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> CoreResult<Option<User>> {
        self.injected_failure()?;
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn find_post(&self, id: Uuid) -> CoreResult<Option<Post>> {
        self.injected_failure()?;
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn find_post_by_slug(&self, slug: &str) -> CoreResult<Option<Post>> {
        self.injected_failure()?;
        let tables = self.tables.read().await;
        Ok(tables.posts.values().find(|p| p.slug == slug).cloned())
    }

    async fn list_posts(&self, query: &PostQuery) -> CoreResult<Page<Post>> {
        self.injected_failure()?;
        let query = query.clone().normalized();
        let tables = self.tables.read().await;

        let mut matched: Vec<&Post> = tables.posts.values().filter(|p| query.matches(p)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(query.offset())
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, query.page, query.limit, total))
    }

    async fn insert_post(&self, post: Post) -> CoreResult<Post> {
        self.injected_failure()?;
        let mut tables = self.tables.write().await;
        if tables.posts.values().any(|p| p.slug == post.slug) {
            return Err(CoreError::Conflict(format!("Slug already in use: {}", post.slug)));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, post: Post) -> CoreResult<Option<Post>> {
        self.injected_failure()?;
        let mut tables = self.tables.write().await;
        match tables.posts.get_mut(&post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    async fn delete_post(&self, id: Uuid) -> CoreResult<bool> {
        self.injected_failure()?;
        let mut tables = self.tables.write().await;
        let existed = tables.posts.remove(&id).is_some();
        if existed {
            tables.comments.retain(|_, c| c.post_id != id);
        }
        Ok(existed)
    }

    async fn increment_claps(&self, id: Uuid) -> CoreResult<Option<u64>> {
        self.injected_failure()?;
        let mut tables = self.tables.write().await;
        Ok(tables.posts.get_mut(&id).map(|p| {
            p.claps += 1;
            p.claps
        }))
    }

    async fn find_comment(&self, id: Uuid) -> CoreResult<Option<Comment>> {
        self.injected_failure()?;
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, post_id: Option<Uuid>) -> CoreResult<Vec<Comment>> {
        self.injected_failure()?;
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| post_id.map_or(true, |id| c.post_id == id))
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn insert_comment(&self, comment: Comment) -> CoreResult<Comment> {
        self.injected_failure()?;
        let mut tables = self.tables.write().await;
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> CoreResult<bool> {
        self.injected_failure()?;
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }

    async fn insert_reset(&self, reset: PasswordReset) -> CoreResult<()> {
        self.injected_failure()?;
        self.tables.write().await.resets.insert(reset.id, reset);
        Ok(())
    }

    async fn take_active_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<PasswordReset>> {
        self.injected_failure()?;
        let mut tables = self.tables.write().await;
        let Some(reset) = tables
            .resets
            .values_mut()
            .find(|r| r.token_hash == token_hash && r.is_active(now))
        else {
            return Ok(None);
        };
        reset.used = true;
        Ok(Some(reset.clone()))
    }
}
