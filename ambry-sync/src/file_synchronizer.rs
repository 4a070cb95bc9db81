//! Long-running file synchronizer for one sync root.
//!
//! One task owns the whole root: watch events, the poll interval, the
//! connectivity feed, debounce deadlines, and commands are all arms of a
//! single `tokio::select!` loop, so no two passes for the same root can
//! overlap.

use crate::debounce::Debouncer;
use crate::error::{SyncError, SyncResult};
use crate::ops::{SyncSummary, pull_root, push_root, resolve_conflict};
use ambry_ldp::LdpFilePersister;
use ambry_state::{Connectivity, FilesystemDriver, SyncStateStore};
use ambry_types::{ConflictResolution, SyncRoot, WatchEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Timing knobs for the synchronizer loop.
#[derive(Clone, Debug)]
pub struct SyncTiming {
    /// Interval between inbound pull passes.
    pub poll_interval: Duration,
    /// Quiet period after a watch event before the outbound push fires.
    pub outbound_debounce: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            outbound_debounce: Duration::from_secs(1),
        }
    }
}

/// Commands accepted by the running loop.
pub enum FileSyncCommand {
    PushNow {
        reply: oneshot::Sender<SyncResult<SyncSummary>>,
    },
    PullNow {
        reply: oneshot::Sender<SyncResult<SyncSummary>>,
    },
    Resolve {
        path: String,
        resolution: ConflictResolution,
        reply: oneshot::Sender<SyncResult<()>>,
    },
    Stop,
}

/// Cloneable handle for sending commands to a running synchronizer.
#[derive(Clone, Debug)]
pub struct FileSynchronizerHandle {
    command_tx: mpsc::Sender<FileSyncCommand>,
}

impl FileSynchronizerHandle {
    pub async fn push_now(&self) -> SyncResult<SyncSummary> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(FileSyncCommand::PushNow { reply })
            .await
            .map_err(|_| SyncError::ChannelClosed)?;
        rx.await.map_err(|_| SyncError::ChannelClosed)?
    }

    pub async fn pull_now(&self) -> SyncResult<SyncSummary> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(FileSyncCommand::PullNow { reply })
            .await
            .map_err(|_| SyncError::ChannelClosed)?;
        rx.await.map_err(|_| SyncError::ChannelClosed)?
    }

    pub async fn resolve(&self, path: &str, resolution: ConflictResolution) -> SyncResult<()> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(FileSyncCommand::Resolve {
                path: path.to_string(),
                resolution,
                reply,
            })
            .await
            .map_err(|_| SyncError::ChannelClosed)?;
        rx.await.map_err(|_| SyncError::ChannelClosed)?
    }

    /// Stops the loop. Safe to call more than once; a loop that has already
    /// stopped just ignores the extra request.
    pub async fn stop(&self) {
        let _ = self.command_tx.send(FileSyncCommand::Stop).await;
    }
}

/// File synchronizer for one root. Construct with
/// [`create_file_synchronizer`] and drive with [`FileSynchronizer::run`], or
/// call the pass methods directly for one-shot use.
pub struct FileSynchronizer {
    root: SyncRoot,
    state: SyncStateStore,
    fs: Arc<dyn FilesystemDriver>,
    persister: LdpFilePersister,
    connectivity: Arc<dyn Connectivity>,
    timing: SyncTiming,
    command_rx: mpsc::Receiver<FileSyncCommand>,
}

impl std::fmt::Debug for FileSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSynchronizer")
            .field("root", &self.root)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

/// Validates the root against every other enabled root before anything
/// starts watching: overlapping local directories would push each other's
/// pulls back out forever.
pub fn create_file_synchronizer(
    root: SyncRoot,
    all_roots: &[SyncRoot],
    state: SyncStateStore,
    fs: Arc<dyn FilesystemDriver>,
    persister: LdpFilePersister,
    connectivity: Arc<dyn Connectivity>,
    timing: SyncTiming,
) -> SyncResult<(FileSynchronizer, FileSynchronizerHandle)> {
    for other in all_roots.iter().filter(|r| r.enabled && r.id != root.id) {
        if root.overlaps(other) {
            return Err(SyncError::RootOverlap {
                root_id: root.id.clone(),
                local_path: root.local_path.clone(),
                other_id: other.id.clone(),
                other_path: other.local_path.clone(),
            });
        }
    }

    let (command_tx, command_rx) = mpsc::channel(16);
    let synchronizer = FileSynchronizer {
        root,
        state,
        fs,
        persister,
        connectivity,
        timing,
        command_rx,
    };
    Ok((synchronizer, FileSynchronizerHandle { command_tx }))
}

impl FileSynchronizer {
    /// One outbound push pass.
    pub async fn push_all(&self) -> SyncResult<SyncSummary> {
        push_root(
            &self.root,
            &self.state,
            self.fs.as_ref(),
            &self.persister,
            self.connectivity.as_ref(),
        )
        .await
    }

    /// One inbound pull pass.
    pub async fn pull_all(&self) -> SyncResult<SyncSummary> {
        pull_root(&self.root, &self.state, self.fs.as_ref(), &self.persister).await
    }

    pub async fn resolve(&self, path: &str, resolution: ConflictResolution) -> SyncResult<()> {
        resolve_conflict(
            path,
            resolution,
            &self.root,
            &self.state,
            self.fs.as_ref(),
            &self.persister,
        )
        .await
    }

    /// Runs the synchronizer loop until `Stop` arrives or every handle is
    /// dropped. A disabled root returns immediately.
    pub async fn run(mut self) -> SyncResult<()> {
        if !self.root.enabled {
            return Ok(());
        }

        let mut watch_rx = self.fs.watch(&self.root.local_path);
        let mut watch_alive = true;
        let mut online_rx = self.connectivity.subscribe();
        let mut online_alive = true;
        // interval_at so the first pull happens one period in, not at start.
        let mut poll = tokio::time::interval_at(
            Instant::now() + self.timing.poll_interval,
            self.timing.poll_interval,
        );
        let mut debouncer = Debouncer::new(self.timing.outbound_debounce);

        info!(root = %self.root.id, "[SYNC] file synchronizer started");

        loop {
            let next_flush = debouncer.next_deadline();
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(FileSyncCommand::PushNow { reply }) => {
                            let _ = reply.send(self.push_all().await);
                        }
                        Some(FileSyncCommand::PullNow { reply }) => {
                            let result = self.pull_all().await;
                            Self::drain_watch_echo(&mut watch_rx);
                            let _ = reply.send(result);
                        }
                        Some(FileSyncCommand::Resolve { path, resolution, reply }) => {
                            let _ = reply.send(self.resolve(&path, resolution).await);
                        }
                        Some(FileSyncCommand::Stop) | None => break,
                    }
                }

                event = watch_rx.recv(), if watch_alive => {
                    match event {
                        Some(event) => self.note_watch_event(&mut debouncer, event),
                        None => watch_alive = false,
                    }
                }

                changed = online_rx.changed(), if online_alive => {
                    match changed {
                        Ok(()) => {
                            if *online_rx.borrow_and_update() {
                                debug!(root = %self.root.id, "[SYNC] back online, pushing");
                                debouncer.clear();
                                self.push_pass().await;
                            }
                        }
                        Err(_) => online_alive = false,
                    }
                }

                _ = poll.tick() => {
                    self.pull_pass(&mut watch_rx).await;
                }

                _ = tokio::time::sleep_until(next_flush.unwrap_or_else(Instant::now)),
                    if next_flush.is_some() =>
                {
                    if !debouncer.take_due(Instant::now()).is_empty() {
                        self.push_pass().await;
                    }
                }
            }
        }

        info!(root = %self.root.id, "[SYNC] file synchronizer stopped");
        Ok(())
    }

    fn note_watch_event(&self, debouncer: &mut Debouncer, event: WatchEvent) {
        if self.root.readonly || !event.is_content_change() {
            return;
        }
        debouncer.schedule(event.path);
    }

    /// Drops watch events emitted by the pull pass's own local writes so they
    /// do not get pushed straight back out.
    fn drain_watch_echo(watch_rx: &mut mpsc::UnboundedReceiver<WatchEvent>) {
        while watch_rx.try_recv().is_ok() {}
    }

    async fn push_pass(&self) {
        if let Err(e) = self.push_all().await {
            warn!(root = %self.root.id, error = %e, "[SYNC] push pass failed");
        }
    }

    async fn pull_pass(&self, watch_rx: &mut mpsc::UnboundedReceiver<WatchEvent>) {
        if let Err(e) = self.pull_all().await {
            warn!(root = %self.root.id, error = %e, "[SYNC] pull pass failed");
        }
        Self::drain_watch_echo(watch_rx);
    }
}
