//! Typed accessors for the persisted sync tables.
//!
//! Both tables are plain JSON rows over the [`RecordStore`] seam: sync roots
//! keyed by root id, file sync state keyed by absolute local path. Rows that
//! fail to deserialize are skipped rather than surfaced; a corrupt row must
//! not wedge a sync pass.

use crate::records::RecordStore;
use ambry_types::{FileSyncState, SyncRoot};
use std::sync::Arc;

pub const FILE_SYNC_STATE_TABLE: &str = "file_sync_state";
pub const SYNC_ROOTS_TABLE: &str = "sync_roots";

/// Accessor for the per-file sync-state table.
#[derive(Clone)]
pub struct SyncStateStore {
    store: Arc<dyn RecordStore>,
}

impl SyncStateStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, path: &str) -> Option<FileSyncState> {
        let row = self.store.get_row(FILE_SYNC_STATE_TABLE, path)?;
        serde_json::from_value(row).ok()
    }

    pub fn set(&self, state: &FileSyncState) {
        if let Ok(row) = serde_json::to_value(state) {
            self.store.set_row(FILE_SYNC_STATE_TABLE, &state.path, row);
        }
    }

    pub fn delete(&self, path: &str) {
        self.store.del_row(FILE_SYNC_STATE_TABLE, path);
    }

    pub fn list_for_root(&self, root_id: &str) -> Vec<FileSyncState> {
        self.store
            .list_rows(FILE_SYNC_STATE_TABLE)
            .into_iter()
            .filter_map(|(_, row)| serde_json::from_value::<FileSyncState>(row).ok())
            .filter(|state| state.root_id == root_id)
            .collect()
    }
}

/// Accessor for the sync-root configuration table.
#[derive(Clone)]
pub struct SyncRootStore {
    store: Arc<dyn RecordStore>,
}

impl SyncRootStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, id: &str) -> Option<SyncRoot> {
        let row = self.store.get_row(SYNC_ROOTS_TABLE, id)?;
        serde_json::from_value(row).ok()
    }

    pub fn set(&self, root: &SyncRoot) {
        if let Ok(row) = serde_json::to_value(root) {
            self.store.set_row(SYNC_ROOTS_TABLE, &root.id, row);
        }
    }

    pub fn delete(&self, id: &str) {
        self.store.del_row(SYNC_ROOTS_TABLE, id);
    }

    pub fn list(&self) -> Vec<SyncRoot> {
        self.store
            .list_rows(SYNC_ROOTS_TABLE)
            .into_iter()
            .filter_map(|(_, row)| serde_json::from_value(row).ok())
            .collect()
    }
}
