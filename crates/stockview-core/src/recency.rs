#![forbid(unsafe_code)]

//! Recency classification for the "new" badge.

use chrono::{DateTime, TimeDelta, Utc};

/// Records posted within this window before `now` count as new.
pub const RECENT_WINDOW: TimeDelta = TimeDelta::days(7);

/// Whether `posted` falls within [`RECENT_WINDOW`] before `now`.
///
/// Both ends are inclusive. A posting instant after `now` is never recent.
#[inline]
pub fn is_recent(posted: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    is_recent_within(posted, now, RECENT_WINDOW)
}

/// [`is_recent`] with an explicit window.
pub fn is_recent_within(posted: DateTime<Utc>, now: DateTime<Utc>, window: TimeDelta) -> bool {
    if posted > now {
        return false;
    }
    now.signed_duration_since(posted) <= window
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current instant.
///
/// Rendering asks the clock once per frame so every item in that frame is
/// classified against the same `now`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant. Used in tests and deterministic replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
