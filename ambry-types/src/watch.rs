//! Filesystem watch events, as delivered by the local watcher collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventKind {
    Created,
    Modified,
    Deleted,
    /// Anything else the platform watcher reports (renames, metadata churn).
    /// Synchronizers ignore these.
    Other,
}

/// One ephemeral watcher notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: String,
    pub timestamp: DateTime<Utc>,
}

impl WatchEvent {
    pub fn now(kind: WatchEventKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    /// True for the event kinds that can change file content.
    pub fn is_content_change(&self) -> bool {
        matches!(
            self.kind,
            WatchEventKind::Created | WatchEventKind::Modified | WatchEventKind::Deleted
        )
    }
}
