//! Per-file sync state, one row per tracked local path.

use serde::{Deserialize, Serialize};

/// Where a tracked file stands relative to its pod copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local and pod copies agree as of the last pass.
    Synced,
    /// A local change has not yet reached the pod (offline, or push failed).
    PendingUpload,
    /// A local deletion has not yet reached the pod.
    PendingDelete,
    /// Both sides changed. Never auto-resolved; requires explicit resolution.
    Conflict,
}

/// One sync-state row, keyed by absolute local path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSyncState {
    pub path: String,
    pub root_id: String,
    /// Opaque revision token from the pod's last response, if any.
    pub pod_etag: Option<String>,
    /// Hex SHA-256 of the bytes as of the last reconciliation.
    pub content_hash: String,
    pub status: SyncStatus,
}

/// How to resolve a row stuck in [`SyncStatus::Conflict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictResolution {
    /// Push the local bytes, overwriting the pod copy.
    KeepLocal,
    /// Fetch the pod bytes, overwriting the local copy.
    KeepPod,
    /// Save the local bytes aside as `<stem>.local.<ext>`, then take the pod copy.
    KeepBoth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::PendingUpload).unwrap(),
            "\"pending_upload\""
        );
        assert_eq!(
            serde_json::from_str::<SyncStatus>("\"conflict\"").unwrap(),
            SyncStatus::Conflict
        );
    }

    #[test]
    fn resolution_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ConflictResolution::KeepBoth).unwrap(),
            "\"keep-both\""
        );
    }

    #[test]
    fn state_row_round_trips() {
        let row = FileSyncState {
            path: "/notes/a.txt".into(),
            root_id: "r1".into(),
            pod_etag: None,
            content_hash: "abc".into(),
            status: SyncStatus::Synced,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(serde_json::from_value::<FileSyncState>(json).unwrap(), row);
    }
}
