//! Bidirectional synchronization engines between local state and an LDP pod.
//!
//! Two synchronizers share one loop shape: the file synchronizer mirrors a
//! local directory tree into a pod container, the record synchronizer mirrors
//! record-store tables into per-table containers of JSON-LD documents. Both
//! debounce outbound changes, poll inbound on an interval, and drop the
//! echoes of their own writes.

mod debounce;
mod error;
mod file_synchronizer;
mod hash;
mod ops;
mod record_synchronizer;

pub use debounce::Debouncer;
pub use error::{SyncError, SyncResult};
pub use file_synchronizer::{
    FileSyncCommand, FileSynchronizer, FileSynchronizerHandle, SyncTiming,
    create_file_synchronizer,
};
pub use hash::content_hash;
pub use ops::{SyncSummary, list_local_files, pull_root, push_root, resolve_conflict};
pub use record_synchronizer::{
    DocumentToRecord, RecordSyncCommand, RecordSyncSummary, RecordSynchronizer,
    RecordSynchronizerHandle, RecordToDocument, TableBinding, create_record_synchronizer,
};
