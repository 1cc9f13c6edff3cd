//! Posts, their creation and update inputs, and listing queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::SessionIdentity;

/// Characters of content used for a derived excerpt.
pub const EXCERPT_LEN: usize = 140;

const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    /// Raw markdown.
    pub content: String,
    pub cover_image: String,
    pub tags: Vec<String>,
    pub author_email: String,
    pub author_name: String,
    pub published: bool,
    pub draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub claps: u64,
}

impl Post {
    /// Visible to anonymous readers.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.published && !self.draft
    }
}

/// Lowercases `title` and collapses every run of characters outside
/// `[a-z0-9]` into a single `-`, trimming dashes at both ends.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn excerpt_of(content: &str) -> String {
    content.chars().take(EXCERPT_LEN).collect()
}

/// Body of a create request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub draft: bool,
}

impl NewPost {
    /// Builds the stored record, filling in slug, title and excerpt
    /// defaults.
    #[must_use]
    pub fn into_post(self, author: &SessionIdentity, now: DateTime<Utc>) -> Post {
        let id = Uuid::new_v4();
        let slug = self
            .slug
            .filter(|s| !s.is_empty())
            .or_else(|| self.title.as_deref().map(slugify))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let content = self.content.unwrap_or_default();
        let excerpt = self
            .excerpt
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| excerpt_of(&content));

        Post {
            id,
            slug,
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            excerpt,
            content,
            cover_image: self.cover_image.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            author_email: author.email.clone(),
            author_name: author.name.clone(),
            published: self.published,
            draft: self.draft,
            created_at: now,
            updated_at: now,
            claps: 0,
        }
    }
}

/// Body of an update request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    /// Target post, for routes that carry the id in the body.
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
    pub draft: Option<bool>,
}

impl PostUpdate {
    /// Applies the update. A new `content` without an explicit `excerpt`
    /// re-derives the excerpt; a `published` flag without an explicit
    /// `draft` sets `draft = !published`.
    pub fn apply(self, post: &mut Post, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            post.title = title;
        }
        match (self.excerpt, self.content.as_deref()) {
            (Some(excerpt), _) => post.excerpt = excerpt,
            (None, Some(content)) => post.excerpt = excerpt_of(content),
            (None, None) => {}
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(cover) = self.cover_image {
            post.cover_image = cover;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(published) = self.published {
            post.published = published;
            post.draft = self.draft.unwrap_or(!published);
        } else if let Some(draft) = self.draft {
            post.draft = draft;
        }
        post.updated_at = now;
    }
}

/// Filters for a post listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub tag: Option<String>,
    /// Case-insensitive substring over title and content.
    pub search: Option<String>,
    pub author_email: Option<String>,
    /// Keep only `published && !draft`.
    pub published_only: bool,
    pub page: u32,
    pub limit: u32,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            tag: None,
            search: None,
            author_email: None,
            published_only: true,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PostQuery {
    /// Clamps `page` to at least 1 and `limit` to `1..=100`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }

    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        if self.published_only && !post.is_public() {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !post.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(author) = &self.author_email {
            if &post.author_email != author {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !post.title.to_lowercase().contains(&needle)
                && !post.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}
