//! LDP pod client for Ambry.
//!
//! Translates resource operations into HTTP against a hierarchical
//! container store: containers are created with `POST` + `Slug` + a
//! BasicContainer `Link`, resources with `PUT`, and membership is read from
//! `ldp:contains` listings (paginated via `Link: rel="next"`).

mod containers;
mod error;
mod file_persister;
mod record_persister;
mod session;

pub use error::{LdpError, LdpResult};
pub use file_persister::{FetchedFile, LdpFilePersister, RemoteFile, RemoteStat, mime_for_path};
pub use record_persister::LdpRecordPersister;
pub use session::{PodSession, derive_pod_root_from_web_id};
