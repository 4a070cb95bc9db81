//! Sync-root configuration and the local-path <-> pod-URL resolver.
//!
//! A sync root pairs one local directory with one pod container. Both sides
//! must end with `/` so that prefix checks are segment-safe: `/a/` is never
//! treated as a prefix of `/ab/`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One configured local-directory <-> pod-container pairing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRoot {
    pub id: String,
    pub label: String,
    /// Absolute local directory, trailing `/` required.
    pub local_path: String,
    /// Absolute pod container URL, trailing `/` required.
    pub pod_url: String,
    /// WebID of the identity that owns the pod.
    pub web_id: String,
    pub readonly: bool,
    pub enabled: bool,
}

#[derive(Debug, Error)]
pub enum RootError {
    #[error("sync root {id}: local_path must end with '/': {path}")]
    LocalPathNotDirectory { id: String, path: String },

    #[error("sync root {id}: pod_url must end with '/': {url}")]
    PodUrlNotContainer { id: String, url: String },
}

impl SyncRoot {
    /// Checks the trailing-slash invariants on both sides of the pairing.
    pub fn validate(&self) -> Result<(), RootError> {
        if !self.local_path.ends_with('/') {
            return Err(RootError::LocalPathNotDirectory {
                id: self.id.clone(),
                path: self.local_path.clone(),
            });
        }
        if !self.pod_url.ends_with('/') {
            return Err(RootError::PodUrlNotContainer {
                id: self.id.clone(),
                url: self.pod_url.clone(),
            });
        }
        Ok(())
    }

    /// True if the two roots' local directories overlap (either path is a
    /// prefix of the other).
    pub fn overlaps(&self, other: &SyncRoot) -> bool {
        self.local_path.starts_with(&other.local_path)
            || other.local_path.starts_with(&self.local_path)
    }
}

/// Finds the deepest enabled root whose local directory contains `local_path`.
pub fn find_sync_root<'a>(local_path: &str, roots: &'a [SyncRoot]) -> Option<&'a SyncRoot> {
    roots
        .iter()
        .filter(|root| {
            root.enabled && root.local_path.ends_with('/') && local_path.starts_with(&root.local_path)
        })
        .max_by_key(|root| root.local_path.len())
}

/// Strips the root's local directory prefix from an absolute path.
pub fn to_relative_path<'a>(local_path: &'a str, root: &SyncRoot) -> &'a str {
    &local_path[root.local_path.len()..]
}

fn encode_segments(relative: &str) -> String {
    relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Maps an absolute local path under `root` to its pod URL, percent-encoding
/// each path segment and preserving a trailing `/`.
pub fn local_path_to_pod_url(local_path: &str, root: &SyncRoot) -> String {
    let encoded = encode_segments(to_relative_path(local_path, root));
    if local_path.ends_with('/') && !encoded.is_empty() {
        format!("{}{}/", root.pod_url, encoded)
    } else {
        format!("{}{}", root.pod_url, encoded)
    }
}

/// Maps a pod URL under `root` back to an absolute local path, decoding each
/// segment. Returns `None` if the URL is outside the root's container.
pub fn pod_url_to_local_path(pod_url: &str, root: &SyncRoot) -> Option<String> {
    let suffix = pod_url.strip_prefix(&root.pod_url)?;
    let decoded = suffix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect::<Vec<_>>()
        .join("/");
    if decoded.is_empty() {
        return Some(root.local_path.clone());
    }
    let trailer = if pod_url.ends_with('/') { "/" } else { "" };
    Some(format!("{}{}{}", root.local_path, decoded, trailer))
}

/// Returns every pair of roots whose local directories overlap.
pub fn find_root_overlaps(roots: &[SyncRoot]) -> Vec<(&SyncRoot, &SyncRoot)> {
    let mut overlaps = Vec::new();
    for (i, a) in roots.iter().enumerate() {
        for b in &roots[i + 1..] {
            if a.overlaps(b) {
                overlaps.push((a, b));
            }
        }
    }
    overlaps
}
