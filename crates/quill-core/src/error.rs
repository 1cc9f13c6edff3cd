//! Error types for `quill-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`.

/// Unified error type for all core operations.
///
/// The variants mirror the failure taxonomy of the HTTP edge: each one maps
/// to exactly one status code in `quill-web`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No session identity is attached to the request.
    #[error("unauthorized")]
    Unauthorized,

    /// A session exists but does not own the target resource.
    #[error("forbidden")]
    Forbidden,

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller exceeded the attempt budget for an action.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A uniqueness constraint would be violated (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The input failed validation.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// The backing store failed. The message is for logs only.
    #[error("store error: {0}")]
    Store(String),
}

/// Convenience alias used throughout `quill-core`.
pub type CoreResult<T> = Result<T, CoreError>;
