use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two collections the board keeps. A record's collection is fixed when
/// it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Announcements,
    Events,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Announcements, Collection::Events];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Announcements => "announcements",
            Collection::Events => "events",
        }
    }

    /// Table holding this collection's documents.
    pub fn table_name(&self) -> &'static str {
        self.as_str()
    }

    /// Order used by both the admin list and the public display.
    ///
    /// Events read chronologically forward; announcements show the newest
    /// start first.
    pub fn display_order(&self) -> SortOrder {
        match self {
            Collection::Announcements => SortOrder::StartDesc,
            Collection::Events => SortOrder::StartAsc,
        }
    }

    /// Singular noun used in user-facing text ("No active events yet").
    pub fn singular(&self) -> &'static str {
        match self {
            Collection::Announcements => "announcement",
            Collection::Events => "event",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "announcements" | "announcement" => Ok(Collection::Announcements),
            "events" | "event" => Ok(Collection::Events),
            other => Err(format!("Unknown content type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    StartAsc,
    StartDesc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::StartAsc => "ORDER BY start_date ASC, id ASC",
            SortOrder::StartDesc => "ORDER BY start_date DESC, id ASC",
        }
    }
}

/// A stored announcement or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub collection: Collection,
    pub title: String,
    pub content: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Inclusive at both ends.
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }
}

/// Full document body sent on every write.
///
/// Has no `created_at`: creation stamps it from `updated_at` and an update
/// never resends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPayload {
    pub title: String,
    pub content: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin list entry: the record plus whether it is on the board right now.
#[derive(Debug, Clone, Serialize)]
pub struct AdminListItem {
    #[serde(flatten)]
    pub record: ContentRecord,
    pub active: bool,
}

impl AdminListItem {
    pub fn at(record: ContentRecord, now: DateTime<Utc>) -> Self {
        let active = record.is_active(now);
        Self { record, active }
    }
}
