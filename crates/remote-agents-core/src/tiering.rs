//! Cache freshness tiering — a pure classification of a cached session.

use crate::session::{CachedSession, SessionState};

const FROZEN_AFTER_MS: i64 = 30 * 24 * 60 * 60 * 1000;
const WARM_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Freshness tier of a cached session at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Older than 30 days; treated as immutable, never refetched.
    Frozen,
    /// Terminal state, synced within the last 24 hours; served from cache.
    Warm,
    /// Anything else; refetch on read.
    Hot,
}

/// `t` and the session's timestamps are all wall-clock milliseconds since
/// epoch (see [`crate::platform::Platform::now_millis`]).
///
/// `create_time` on [`crate::session::SessionResource`] is an RFC-3339
/// string; callers parse it once to milliseconds before calling this
/// function so that the pure classification has no I/O or parsing
/// dependency.
#[must_use]
pub fn determine_cache_tier(cached: &CachedSession, create_time_ms: i64, now_ms: i64) -> CacheTier {
    if now_ms.saturating_sub(create_time_ms) > FROZEN_AFTER_MS {
        return CacheTier::Frozen;
    }

    let is_terminal = matches!(
        cached.resource.state,
        SessionState::Completed | SessionState::Failed
    );
    if is_terminal && now_ms.saturating_sub(cached.last_synced_at) < WARM_WINDOW_MS {
        return CacheTier::Warm;
    }

    CacheTier::Hot
}

/// `true` iff the tier is warm or frozen — i.e. a read can be served from
/// cache without hitting the network.
#[must_use]
pub fn is_cache_valid(cached: &CachedSession, create_time_ms: i64, now_ms: i64) -> bool {
    matches!(
        determine_cache_tier(cached, create_time_ms, now_ms),
        CacheTier::Warm | CacheTier::Frozen
    )
}
