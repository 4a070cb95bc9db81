//! Shared domain types for Ambry.
//!
//! Everything here is plain data: sync-root configuration, per-file sync
//! state, filesystem watch events, and the pure path/URL resolver functions
//! that map between a root's local directory and its pod container.

mod root;
mod sync_state;
mod watch;

pub use root::{
    RootError, SyncRoot, find_root_overlaps, find_sync_root, local_path_to_pod_url,
    pod_url_to_local_path, to_relative_path,
};
pub use sync_state::{ConflictResolution, FileSyncState, SyncStatus};
pub use watch::{WatchEvent, WatchEventKind};
