//! Single-pass push, pull, and conflict-resolution operations for one sync
//! root. The synchronizer loops schedule these; callers can also run them
//! directly for a one-shot sync.

use crate::error::{SyncError, SyncResult};
use crate::hash::content_hash;
use ambry_ldp::{LdpFilePersister, mime_for_path};
use ambry_state::{Connectivity, FilesystemDriver, SyncStateStore};
use ambry_types::{ConflictResolution, FileSyncState, SyncRoot, SyncStatus, to_relative_path};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Outcome counters for one push or pull pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub root_id: String,
    pub uploaded: usize,
    pub downloaded: usize,
    pub conflicts: usize,
    pub errors: Vec<String>,
}

impl SyncSummary {
    fn for_root(root: &SyncRoot) -> Self {
        Self {
            root_id: root.id.clone(),
            ..Self::default()
        }
    }
}

/// Collects every file under `dir`, depth-first, directories excluded.
pub async fn list_local_files(fs: &dyn FilesystemDriver, dir: &str) -> SyncResult<Vec<String>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_string()];
    while let Some(current) = pending.pop() {
        for entry in fs.read_dir(&current).await? {
            if entry.is_directory {
                pending.push(entry.path);
            } else {
                files.push(entry.path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Uploads every local file under the root. Offline, files are marked
/// `pending_upload` (keeping any stored etag) instead of being sent.
/// Read-only roots never push. Per-file failures land in `summary.errors`
/// and do not stop the pass.
pub async fn push_root(
    root: &SyncRoot,
    state: &SyncStateStore,
    fs: &dyn FilesystemDriver,
    persister: &LdpFilePersister,
    connectivity: &dyn Connectivity,
) -> SyncResult<SyncSummary> {
    let mut summary = SyncSummary::for_root(root);
    if root.readonly {
        return Ok(summary);
    }

    for path in list_local_files(fs, &root.local_path).await? {
        let result = push_one(root, state, fs, persister, connectivity, &path).await;
        match result {
            Ok(true) => summary.uploaded += 1,
            Ok(false) => {}
            Err(e) => summary.errors.push(e.to_string()),
        }
    }
    debug!(
        root = %root.id,
        uploaded = summary.uploaded,
        errors = summary.errors.len(),
        "[SYNC] push pass done"
    );
    Ok(summary)
}

async fn push_one(
    root: &SyncRoot,
    state: &SyncStateStore,
    fs: &dyn FilesystemDriver,
    persister: &LdpFilePersister,
    connectivity: &dyn Connectivity,
    path: &str,
) -> SyncResult<bool> {
    let bytes = fs.read_file(path).await?;
    let hash = content_hash(&bytes);

    if !connectivity.is_online() {
        let prior_etag = state.get(path).and_then(|s| s.pod_etag);
        state.set(&FileSyncState {
            path: path.to_string(),
            root_id: root.id.clone(),
            pod_etag: prior_etag,
            content_hash: hash,
            status: SyncStatus::PendingUpload,
        });
        return Ok(false);
    }

    let relative = to_relative_path(path, root);
    let etag = persister
        .put_file(relative, &bytes, mime_for_path(relative))
        .await?;
    state.set(&FileSyncState {
        path: path.to_string(),
        root_id: root.id.clone(),
        pod_etag: etag,
        content_hash: hash,
        status: SyncStatus::Synced,
    });
    Ok(true)
}

/// Downloads pod changes under the root. Matching etags skip the download
/// entirely; matching hashes refresh only the stored etag; pod changes over
/// a `pending_upload` row become conflicts without touching the local copy.
/// After the per-file loop, tracked rows missing from the pod listing are
/// cleaned up: `synced` rows delete the local file and drop the row, anything
/// else becomes a conflict.
pub async fn pull_root(
    root: &SyncRoot,
    state: &SyncStateStore,
    fs: &dyn FilesystemDriver,
    persister: &LdpFilePersister,
) -> SyncResult<SyncSummary> {
    let mut summary = SyncSummary::for_root(root);
    let remote_files = persister.list_files(None).await?;
    let tracked: HashMap<String, FileSyncState> = state
        .list_for_root(&root.id)
        .into_iter()
        .map(|row| (row.path.clone(), row))
        .collect();
    let mut seen = HashSet::new();

    for remote in &remote_files {
        let path = format!("{}{}", root.local_path, remote.path);
        seen.insert(path.clone());
        let existing = tracked.get(&path);

        // Etag short-circuit: pod unchanged since we last looked.
        let stored_etag = existing.and_then(|s| s.pod_etag.as_deref());
        if stored_etag.is_some() && stored_etag == remote.etag.as_deref() {
            continue;
        }

        let result = pull_one(root, state, fs, persister, &remote.path, &path, existing).await;
        match result {
            Ok(PullOutcome::Downloaded) => summary.downloaded += 1,
            Ok(PullOutcome::Conflict) => summary.conflicts += 1,
            Ok(PullOutcome::Skipped) => {}
            Err(e) => summary.errors.push(e.to_string()),
        }
    }

    // Cleanup runs only after every per-file decision is made.
    for (path, row) in tracked {
        if seen.contains(&path) {
            continue;
        }
        if row.status == SyncStatus::Synced {
            // Nothing local is pending; mirror the pod-side delete.
            if fs.remove_file(&path).await.is_err() {
                debug!(%path, "[SYNC] local file already gone");
            }
            state.delete(&path);
        } else {
            state.set(&FileSyncState {
                status: SyncStatus::Conflict,
                ..row
            });
            summary.conflicts += 1;
        }
    }

    debug!(
        root = %root.id,
        downloaded = summary.downloaded,
        conflicts = summary.conflicts,
        errors = summary.errors.len(),
        "[SYNC] pull pass done"
    );
    Ok(summary)
}

enum PullOutcome {
    Downloaded,
    Conflict,
    Skipped,
}

async fn pull_one(
    root: &SyncRoot,
    state: &SyncStateStore,
    fs: &dyn FilesystemDriver,
    persister: &LdpFilePersister,
    relative: &str,
    path: &str,
    existing: Option<&FileSyncState>,
) -> SyncResult<PullOutcome> {
    let Some(fetched) = persister.get_file(relative).await? else {
        return Ok(PullOutcome::Skipped);
    };
    let remote_hash = content_hash(&fetched.bytes);

    if let Some(existing) = existing {
        // Same bytes under a new etag (pod-side re-upload). Record the etag
        // so the short-circuit works next pass; no disk write.
        if existing.content_hash == remote_hash {
            state.set(&FileSyncState {
                pod_etag: fetched.etag,
                ..existing.clone()
            });
            return Ok(PullOutcome::Skipped);
        }

        // Real pod change over unpushed local edits: flag it, never clobber.
        if existing.status == SyncStatus::PendingUpload {
            state.set(&FileSyncState {
                status: SyncStatus::Conflict,
                ..existing.clone()
            });
            return Ok(PullOutcome::Conflict);
        }
    }

    fs.write_file(path, &fetched.bytes).await?;
    state.set(&FileSyncState {
        path: path.to_string(),
        root_id: root.id.clone(),
        pod_etag: fetched.etag,
        content_hash: remote_hash,
        status: SyncStatus::Synced,
    });
    Ok(PullOutcome::Downloaded)
}

/// `stem.local.ext` sibling for keep-both; dot-less names get `.local`
/// appended. Only the final path segment is inspected.
fn sibling_local_path(path: &str) -> String {
    let split_at = match path.rfind('/') {
        Some(slash) => path[slash + 1..].rfind('.').map(|dot| slash + 1 + dot),
        None => path.rfind('.'),
    };
    match split_at {
        Some(dot) if dot > 0 => format!("{}.local{}", &path[..dot], &path[dot..]),
        _ => format!("{path}.local"),
    }
}

/// Settles one conflicted file. The row must currently be in `conflict`;
/// afterwards it is `synced` under whichever content won.
pub async fn resolve_conflict(
    path: &str,
    resolution: ConflictResolution,
    root: &SyncRoot,
    state: &SyncStateStore,
    fs: &dyn FilesystemDriver,
    persister: &LdpFilePersister,
) -> SyncResult<()> {
    let row = state
        .get(path)
        .filter(|row| row.status == SyncStatus::Conflict)
        .ok_or_else(|| SyncError::NoConflict(path.to_string()))?;

    let relative = to_relative_path(path, root);

    if resolution == ConflictResolution::KeepLocal {
        let bytes = fs.read_file(path).await?;
        let etag = persister
            .put_file(relative, &bytes, mime_for_path(path))
            .await?;
        state.set(&FileSyncState {
            pod_etag: etag,
            content_hash: content_hash(&bytes),
            status: SyncStatus::Synced,
            ..row
        });
        return Ok(());
    }

    let pod_file = persister
        .get_file(relative)
        .await?
        .ok_or_else(|| SyncError::RemoteMissing(path.to_string()))?;

    if resolution == ConflictResolution::KeepBoth {
        let bytes = fs.read_file(path).await?;
        fs.write_file(&sibling_local_path(path), &bytes).await?;
    }

    fs.write_file(path, &pod_file.bytes).await?;
    state.set(&FileSyncState {
        pod_etag: pod_file.etag,
        content_hash: content_hash(&pod_file.bytes),
        status: SyncStatus::Synced,
        ..row
    });
    Ok(())
}
