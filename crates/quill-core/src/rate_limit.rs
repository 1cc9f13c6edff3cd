//! Fixed-window attempt counter keyed by caller and action.
//!
//! Each key (for example `"login:alice@example.com"` or
//! `"register:203.0.113.7"`) owns one [`RateBucket`]. A bucket counts every
//! attempt, denied ones included, until the window has elapsed; the next
//! attempt after that starts a fresh window with a count of one.
//!
//! A caller can fit `limit` attempts just before a window boundary and
//! another `limit` just after it. That burst is accepted behaviour of a fixed
//! window and is not smoothed out here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

/// Attempts allowed per window when the caller has no specific rule.
pub const DEFAULT_LIMIT: u32 = 10;

/// Window length used when the caller has no specific rule.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(60_000);

/// Per-key counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBucket {
    /// Attempts observed since `window_start`.
    pub count: u32,
    /// When the current window began.
    pub window_start: Instant,
    /// Window length the bucket was last checked with. Used for pruning.
    pub window: Duration,
}

impl RateBucket {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            window_start: now,
            window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) > self.window
    }
}

/// A configured `(limit, window)` pair for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub limit: u32,
    pub window_secs: u64,
}

impl RateLimitRule {
    #[must_use]
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitRule {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window_secs: DEFAULT_WINDOW.as_secs(),
        }
    }
}

/// Process-wide bucket map.
///
/// The read-modify-write in [`RateLimiter::check`] runs while holding the
/// map entry, so two concurrent checks on the same key are serialised.
pub struct RateLimiter {
    buckets: DashMap<String, RateBucket>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
        }
    }

    /// Limiter driven by the system clock.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Records an attempt for `key` and reports whether it is allowed.
    ///
    /// Returns `false` once more than `limit` attempts have been seen inside
    /// the current window. A denied attempt still counts and does not move
    /// the window.
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> bool {
        let now = self.clock.now();
        let mut entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| RateBucket {
                count: 0,
                window_start: now,
                window,
            });
        let bucket = entry.value_mut();

        if bucket.count == 0 || bucket.is_expired(now) {
            *bucket = RateBucket::fresh(now, window);
            return true;
        }

        bucket.window = window;
        bucket.count = bucket.count.saturating_add(1);
        if bucket.count > limit {
            tracing::debug!(key, count = bucket.count, limit, "rate limit exceeded");
            return false;
        }
        true
    }

    /// [`check`](Self::check) with [`DEFAULT_LIMIT`] and [`DEFAULT_WINDOW`].
    pub fn check_default(&self, key: &str) -> bool {
        self.check(key, DEFAULT_LIMIT, DEFAULT_WINDOW)
    }

    /// [`check`](Self::check) with a configured rule.
    pub fn check_rule(&self, key: &str, rule: &RateLimitRule) -> bool {
        self.check(key, rule.limit, rule.window())
    }

    /// Drops buckets whose window has already elapsed and returns how many
    /// were removed. A pruned key behaves exactly as an expired one would on
    /// its next check.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_expired(now));
        before.saturating_sub(self.buckets.len())
    }

    /// Current state of `key`, if tracked.
    pub fn bucket(&self, key: &str) -> Option<RateBucket> {
        self.buckets.get(key).map(|b| *b)
    }

    /// Forget every bucket.
    pub fn reset(&self) {
        self.buckets.clear();
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::system()
    }
}
