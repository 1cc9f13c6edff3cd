//! Registered accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored account. Never serialised directly; see [`Profile`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub bio: String,
    pub avatar: String,
    /// Emails of followed authors.
    pub following: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New account with an empty profile. The name defaults to the local
    /// part of the email.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        name: Option<String>,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        let email = email.into();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            bio: String::new(),
            avatar: String::new(),
            following: Vec::new(),
            created_at: now,
        }
    }

    /// Follows `target` if not yet followed, unfollows otherwise.
    /// Returns `true` when the user now follows `target`.
    pub fn toggle_follow(&mut self, target: &str) -> bool {
        if let Some(pos) = self.following.iter().position(|f| f == target) {
            self.following.remove(pos);
            false
        } else {
            self.following.push(target.to_string());
            true
        }
    }

    #[must_use]
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            bio: self.bio.clone(),
            avatar: self.avatar.clone(),
            following: self.following.clone(),
        }
    }
}

/// Public projection of a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub bio: String,
    pub avatar: String,
    pub following: Vec<String>,
}

/// Editable profile fields. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
        if let Some(avatar) = self.avatar {
            user.avatar = avatar;
        }
    }
}
