//! Local-store collaborator seams for Ambry.
//!
//! The synchronizers never touch the real filesystem, reactive store, or
//! network-status APIs directly; they go through the traits defined here.
//! In-memory implementations back the test suites and small deployments;
//! hosts wire in their own drivers for production.

mod connectivity;
mod error;
mod fs;
mod records;
mod sync_tables;

pub use connectivity::{Connectivity, ToggleConnectivity};
pub use error::{StateError, StateResult};
pub use fs::{DirEntry, FilesystemDriver, MemoryFs};
pub use records::{MemoryRecordStore, RecordStore, RowChange};
pub use sync_tables::{
    FILE_SYNC_STATE_TABLE, SYNC_ROOTS_TABLE, SyncRootStore, SyncStateStore,
};
