//! Domain records persisted through [`crate::store::Store`].

pub mod comment;
pub mod post;
pub mod reset;
pub mod user;

use serde::Serialize;

pub use comment::{Comment, NewComment};
pub use post::{slugify, NewPost, Post, PostQuery, PostUpdate, EXCERPT_LEN};
pub use reset::{hash_token, PasswordReset};
pub use user::{Profile, ProfileUpdate, User};

/// One page of a listing plus the numbers a paginator needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            items,
            page,
            limit,
            total,
            total_pages,
        }
    }
}
