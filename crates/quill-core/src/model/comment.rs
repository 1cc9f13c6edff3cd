use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::SessionIdentity;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_email: String,
    pub author_name: String,
    pub body: String,
    /// Comment this one replies to.
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Body of a create request. `post_id` may be a post id or slug.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub body: String,
    pub parent_id: Option<Uuid>,
}

impl Comment {
    #[must_use]
    pub fn new(
        post_id: Uuid,
        author: &SessionIdentity,
        body: String,
        parent_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_email: author.email.clone(),
            author_name: author.display_name().to_string(),
            body,
            parent_id,
            created_at: now,
        }
    }
}
