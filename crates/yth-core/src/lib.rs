//! Core domain model for the YouTube harvester.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod duration;

pub const CRATE_NAME: &str = "yth-core";

/// Rendered in place of a statistic the upstream could not provide.
pub const UNAVAILABLE_LABEL: &str = "Not Available";

/// A per-video counter that may be missing upstream.
///
/// `Unavailable` is distinct from `Count(0)`: it is stored as SQL `NULL` and
/// always sorts after real counts in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    Count(u64),
    Unavailable,
}

impl Statistic {
    /// Parses the string-encoded counters the upstream API returns.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<u64>().ok())
            .map(Statistic::Count)
            .unwrap_or(Statistic::Unavailable)
    }

    pub fn count(self) -> Option<u64> {
        match self {
            Statistic::Count(n) => Some(n),
            Statistic::Unavailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Statistic::Count(_))
    }

    /// Column value for a nullable `BIGINT`. Counts past `i64::MAX` saturate.
    pub fn to_db(self) -> Option<i64> {
        self.count().map(saturating_i64)
    }

    pub fn from_db(value: Option<i64>) -> Self {
        match value {
            Some(n) if n >= 0 => Statistic::Count(n as u64),
            _ => Statistic::Unavailable,
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Count(n) => write!(f, "{n}"),
            Statistic::Unavailable => f.write_str(UNAVAILABLE_LABEL),
        }
    }
}

pub fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Snapshot of a channel as of the last fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel_id: String,
    pub channel_name: String,
    pub description: String,
    pub subscriber_count: u64,
    pub total_videos: u64,
    pub total_views: u64,
    pub channel_status: String,
}

/// One video plus the statistics gathered for it during a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub views: Statistic,
    pub likes: Statistic,
    pub total_comments: Statistic,
    pub duration: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl VideoRecord {
    /// True when any statistic had to fall back to `Unavailable`.
    pub fn is_degraded(&self) -> bool {
        !(self.views.is_available()
            && self.likes.is_available()
            && self.total_comments.is_available())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Result of persisting one channel and its videos in a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub channel: UpsertOutcome,
    pub videos_inserted: usize,
    pub videos_updated: usize,
}

impl BatchOutcome {
    pub fn new(channel: UpsertOutcome) -> Self {
        Self {
            channel,
            videos_inserted: 0,
            videos_updated: 0,
        }
    }

    pub fn record_video(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.videos_inserted += 1,
            UpsertOutcome::Updated => self.videos_updated += 1,
        }
    }
}
