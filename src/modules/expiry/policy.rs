//! Lifetimes of every ephemeral entity. Each entity stores an absolute
//! `expires_at` computed from these durations when it is written.

use chrono::{DateTime, Duration, Utc};

pub const UNVIEWED_SNAP_TTL: Duration = Duration::hours(24);
pub const VIEWED_SNAP_TTL: Duration = Duration::seconds(10);
pub const STORY_TTL: Duration = Duration::hours(24);
pub const QUIZ_TTL: Duration = Duration::hours(24);
pub const ANONYMOUS_CHAT_DURATION: Duration = Duration::minutes(10);
pub const ANONYMOUS_CHAT_RETENTION: Duration = Duration::hours(1);

/// `None` never expires; otherwise an entity is live strictly before its deadline.
pub fn is_live(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(deadline) => now < deadline,
        None => true,
    }
}

pub fn snap_expiry(sent_at: DateTime<Utc>) -> DateTime<Utc> {
    sent_at + UNVIEWED_SNAP_TTL
}

pub fn viewed_snap_expiry(viewed_at: DateTime<Utc>) -> DateTime<Utc> {
    viewed_at + VIEWED_SNAP_TTL
}

pub fn story_expiry(posted_at: DateTime<Utc>) -> DateTime<Utc> {
    posted_at + STORY_TTL
}

pub fn quiz_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + QUIZ_TTL
}

pub fn chat_ends_at(matched_at: DateTime<Utc>) -> DateTime<Utc> {
    matched_at + ANONYMOUS_CHAT_DURATION
}

/// Anonymous chats created at or before this instant are gone, whatever their state.
pub fn chat_retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - ANONYMOUS_CHAT_RETENTION
}
