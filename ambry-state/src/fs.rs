//! Filesystem driver seam and an in-memory implementation.
//!
//! The in-memory driver emits watch events from its own mutations, which is
//! exactly what the synchronizer needs to exercise debounce and
//! echo-suppression behavior without a real watcher.

use crate::error::{StateError, StateResult};
use ambry_types::{WatchEvent, WatchEventKind};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One directory listing entry. Directory paths carry a trailing `/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub path: String,
    pub is_directory: bool,
}

/// Local filesystem collaborator. Paths are absolute strings; directories end
/// with `/`.
#[async_trait]
pub trait FilesystemDriver: Send + Sync {
    async fn read_file(&self, path: &str) -> StateResult<Vec<u8>>;
    async fn write_file(&self, path: &str, bytes: &[u8]) -> StateResult<()>;
    async fn remove_file(&self, path: &str) -> StateResult<()>;
    /// Lists the direct children of a directory.
    async fn read_dir(&self, path: &str) -> StateResult<Vec<DirEntry>>;
    /// Subscribes to watch events for paths under `path`. The receiver closes
    /// when the driver is dropped.
    fn watch(&self, path: &str) -> mpsc::UnboundedReceiver<WatchEvent>;
}

#[derive(Default)]
struct MemoryFsInner {
    files: BTreeMap<String, Vec<u8>>,
    watchers: Vec<(String, mpsc::UnboundedSender<WatchEvent>)>,
}

/// In-memory filesystem with watch support.
#[derive(Default)]
pub struct MemoryFs {
    inner: Mutex<MemoryFsInner>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a file without emitting a watch event. Test seeding only;
    /// mirrors state that existed before watching began.
    pub fn seed(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().unwrap();
        inner.files.insert(path.into(), bytes.into());
    }

    /// Snapshot read for assertions, without going through the async trait.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().files.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.lock().unwrap().files.contains_key(path)
    }

    fn notify(inner: &mut MemoryFsInner, kind: WatchEventKind, path: &str) {
        inner.watchers.retain(|(prefix, tx)| {
            if !path.starts_with(prefix.as_str()) {
                return !tx.is_closed();
            }
            tx.send(WatchEvent::now(kind, path)).is_ok()
        });
    }
}

#[async_trait]
impl FilesystemDriver for MemoryFs {
    async fn read_file(&self, path: &str) -> StateResult<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StateError::NotFound(path.to_string()))
    }

    async fn write_file(&self, path: &str, bytes: &[u8]) -> StateResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let kind = if inner.files.contains_key(path) {
            WatchEventKind::Modified
        } else {
            WatchEventKind::Created
        };
        inner.files.insert(path.to_string(), bytes.to_vec());
        Self::notify(&mut inner, kind, path);
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> StateResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.files.remove(path).is_none() {
            return Err(StateError::NotFound(path.to_string()));
        }
        Self::notify(&mut inner, WatchEventKind::Deleted, path);
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> StateResult<Vec<DirEntry>> {
        let prefix = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };
        let inner = self.inner.lock().unwrap();
        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for key in inner.files.keys() {
            let Some(rest) = key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    if dirs.insert(child.to_string()) {
                        entries.push(DirEntry {
                            path: format!("{prefix}{child}/"),
                            is_directory: true,
                        });
                    }
                }
                None => entries.push(DirEntry {
                    path: key.clone(),
                    is_directory: false,
                }),
            }
        }
        Ok(entries)
    }

    fn watch(&self, path: &str) -> mpsc::UnboundedReceiver<WatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .lock()
            .unwrap()
            .watchers
            .push((path.to_string(), tx));
        rx
    }
}
