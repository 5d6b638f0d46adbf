use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A structured "this show/season/episode became newly available" fact,
/// extracted from the syndication feed.
///
/// Only the feed parser constructs these, and only from a link that matched
/// the canonical episode pattern. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRelease {
    /// Opaque show identifier in the source catalog (e.g. "Fargo").
    pub show_alias: String,
    pub season_number: u32,
    pub episode_number: u32,
    /// The canonical URL the fact was derived from.
    pub source_link: String,
}

/// One row in the durable notification queue: a pending-or-completed
/// obligation to tell one subscriber about one episode release.
///
/// Invariants enforced by the retry policy, not by this type:
/// - `response_code == None` implies `retry_count == 0` (never attempted)
/// - `retry_count > 0` implies `last_attempt_at` is set
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: Uuid,
    /// Telegram chat id of the delivery target.
    pub subscriber_id: i64,
    pub show_title: String,
    pub show_alias: String,
    pub season_number: i32,
    pub episode_number: i32,
    pub episode_title: String,
    /// HTTP-style status of the last delivery attempt; `None` = never attempted.
    pub response_code: Option<i32>,
    pub retry_count: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Denormalized payload handed to the delivery capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodePayload {
    pub show_title: String,
    pub season_number: i32,
    pub episode_number: i32,
    pub episode_title: String,
    /// Deep link to the episode page.
    pub url: String,
}

/// Result of one delivery attempt. Ephemeral — used only to update the
/// originating `NotificationRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub status_code: u16,
    pub attempted_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Build the delivery payload for this record.
    pub fn payload(&self, url: String) -> EpisodePayload {
        EpisodePayload {
            show_title: self.show_title.clone(),
            season_number: self.season_number,
            episode_number: self.episode_number,
            episode_title: self.episode_title.clone(),
            url,
        }
    }
}
