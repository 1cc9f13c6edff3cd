//! Quill core library: the policy and data layer of the Quill blogging service.
//!
//! `quill-core` holds everything that does not depend on HTTP, so that the
//! web crate stays a thin adapter and the interesting rules can be tested
//! without a server.
//!
//! # Modules
//!
//! - [`rate_limit`]: Fixed-window attempt counter ([`RateLimiter`]) guarding login, registration and password reset.
//! - [`authz`]: Session / ownership decision ([`authorize`]) run by every mutating route.
//! - [`clock`]: Injectable time source ([`Clock`], [`ManualClock`]).
//! - [`model`]: Users, posts, comments, password resets and listing queries.
//! - [`store`]: The [`Store`] trait and the in-memory [`MemoryStore`].
//! - [`error`]: Unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod authz;
pub mod clock;
pub mod error;
pub mod model;
pub mod rate_limit;
pub mod store;

pub use authz::{authorize, require_owner, require_session, AuthDecision, SessionIdentity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use model::{
    Comment, NewComment, NewPost, Page, PasswordReset, Post, PostQuery, PostUpdate, Profile,
    ProfileUpdate, User,
};
pub use rate_limit::{RateBucket, RateLimitRule, RateLimiter, DEFAULT_LIMIT, DEFAULT_WINDOW};
pub use store::{find_post_ref, MemoryStore, Store};
