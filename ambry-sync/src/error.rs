//! Synchronizer error types.

use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync root {root_id} ({local_path}) overlaps enabled root {other_id} ({other_path})")]
    RootOverlap {
        root_id: String,
        local_path: String,
        other_id: String,
        other_path: String,
    },

    #[error("no conflict recorded for {0}")]
    NoConflict(String),

    #[error("pod copy of {0} is missing")]
    RemoteMissing(String),

    #[error(transparent)]
    Ldp(#[from] ambry_ldp::LdpError),

    #[error(transparent)]
    State(#[from] ambry_state::StateError),

    #[error("synchronizer channel closed")]
    ChannelClosed,
}
