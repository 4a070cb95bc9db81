//! Long-running record synchronizer: mirrors record-store tables into
//! per-table pod containers as JSON-LD documents.
//!
//! Same loop shape as the file synchronizer, keyed by row-change events
//! instead of watch events. Outbound flushes are debounced per table;
//! inbound polls apply a remote row only when its `updatedAt` is strictly
//! newer than the local copy's.

use crate::debounce::Debouncer;
use crate::error::{SyncError, SyncResult};
use ambry_ldp::LdpRecordPersister;
use ambry_state::{RecordStore, RowChange};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Maps a local row to the document stored on the pod.
pub type RecordToDocument = Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>;
/// Maps a pod document back to `(row id, row)`. `None` skips the document.
pub type DocumentToRecord = Arc<dyn Fn(&Value) -> Option<(String, Value)> + Send + Sync>;

/// One table mirrored into one pod container, with its mapping functions.
#[derive(Clone)]
pub struct TableBinding {
    pub table: String,
    pub container: String,
    pub to_document: RecordToDocument,
    pub from_document: DocumentToRecord,
}

impl TableBinding {
    /// Binding that stores rows as-is, carrying the row id in an `id` field.
    pub fn passthrough(table: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            container: container.into(),
            to_document: Arc::new(|id, row| {
                let mut doc = row.clone();
                if let Some(obj) = doc.as_object_mut() {
                    obj.insert("id".to_string(), Value::String(id.to_string()));
                }
                doc
            }),
            from_document: Arc::new(|doc| {
                let id = doc.get("id")?.as_str()?.to_string();
                Some((id, doc.clone()))
            }),
        }
    }
}

/// Outcome counters for one flush or poll pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordSyncSummary {
    pub pushed: usize,
    pub deleted: usize,
    pub applied: usize,
    pub errors: Vec<String>,
}

pub enum RecordSyncCommand {
    FlushNow {
        reply: oneshot::Sender<RecordSyncSummary>,
    },
    PollNow {
        reply: oneshot::Sender<RecordSyncSummary>,
    },
    Stop,
}

/// Cloneable handle for sending commands to a running record synchronizer.
#[derive(Clone)]
pub struct RecordSynchronizerHandle {
    command_tx: mpsc::Sender<RecordSyncCommand>,
}

impl RecordSynchronizerHandle {
    /// Flushes every bound table now, pending debounce or not.
    pub async fn flush_now(&self) -> SyncResult<RecordSyncSummary> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(RecordSyncCommand::FlushNow { reply })
            .await
            .map_err(|_| SyncError::ChannelClosed)?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    pub async fn poll_now(&self) -> SyncResult<RecordSyncSummary> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(RecordSyncCommand::PollNow { reply })
            .await
            .map_err(|_| SyncError::ChannelClosed)?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    pub async fn stop(&self) {
        let _ = self.command_tx.send(RecordSyncCommand::Stop).await;
    }
}

/// Record synchronizer over a set of table bindings.
pub struct RecordSynchronizer {
    store: Arc<dyn RecordStore>,
    persister: LdpRecordPersister,
    bindings: Vec<TableBinding>,
    poll_interval: Duration,
    outbound_debounce: Duration,
    pending_deletes: HashMap<String, HashSet<String>>,
    command_rx: mpsc::Receiver<RecordSyncCommand>,
}

pub fn create_record_synchronizer(
    store: Arc<dyn RecordStore>,
    persister: LdpRecordPersister,
    bindings: Vec<TableBinding>,
    poll_interval: Duration,
    outbound_debounce: Duration,
) -> (RecordSynchronizer, RecordSynchronizerHandle) {
    let (command_tx, command_rx) = mpsc::channel(16);
    let pending_deletes = bindings
        .iter()
        .map(|b| (b.table.clone(), HashSet::new()))
        .collect();
    let synchronizer = RecordSynchronizer {
        store,
        persister,
        bindings,
        poll_interval,
        outbound_debounce,
        pending_deletes,
        command_rx,
    };
    (synchronizer, RecordSynchronizerHandle { command_tx })
}

/// Non-empty `updatedAt` string of a row, if present.
fn updated_at(row: &Value) -> Option<&str> {
    row.get("updatedAt")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

impl RecordSynchronizer {
    fn binding(&self, table: &str) -> Option<&TableBinding> {
        self.bindings.iter().find(|b| b.table == table)
    }

    /// Pushes every current row of `table` and then its pending deletes.
    /// Failed deletes go back on the pending set for the next flush.
    pub async fn flush_table(&mut self, table: &str) -> RecordSyncSummary {
        let mut summary = RecordSyncSummary::default();
        let Some(binding) = self.binding(table).cloned() else {
            return summary;
        };
        let deletes = self
            .pending_deletes
            .get_mut(table)
            .map(std::mem::take)
            .unwrap_or_default();

        for (id, row) in self.store.list_rows(table) {
            let document = (binding.to_document)(&id, &row);
            match self
                .persister
                .put_record(&binding.container, &id, &document)
                .await
            {
                Ok(()) => summary.pushed += 1,
                Err(e) => summary.errors.push(e.to_string()),
            }
        }

        for id in deletes {
            match self.persister.delete_record(&binding.container, &id).await {
                Ok(()) => summary.deleted += 1,
                Err(e) => {
                    summary.errors.push(e.to_string());
                    if let Some(set) = self.pending_deletes.get_mut(table) {
                        set.insert(id);
                    }
                }
            }
        }

        debug!(
            table,
            pushed = summary.pushed,
            deleted = summary.deleted,
            errors = summary.errors.len(),
            "[RECORDS] flushed table"
        );
        summary
    }

    async fn flush_all(&mut self) -> RecordSyncSummary {
        let tables: Vec<String> = self.bindings.iter().map(|b| b.table.clone()).collect();
        let mut summary = RecordSyncSummary::default();
        for table in tables {
            let one = self.flush_table(&table).await;
            summary.pushed += one.pushed;
            summary.deleted += one.deleted;
            summary.errors.extend(one.errors);
        }
        summary
    }

    /// Pulls every bound container and applies rows that are strictly newer
    /// than the local copy (RFC 3339 `updatedAt`, string-compared). Rows
    /// without a local counterpart always apply.
    pub async fn poll_pass(&self) -> RecordSyncSummary {
        let mut summary = RecordSyncSummary::default();
        for binding in &self.bindings {
            let documents = match self.persister.list_records(&binding.container).await {
                Ok(documents) => documents,
                Err(e) => {
                    summary.errors.push(e.to_string());
                    continue;
                }
            };
            for document in documents {
                let Some((id, row)) = (binding.from_document)(&document) else {
                    continue;
                };
                let local = self.store.get_row(&binding.table, &id);
                let local_updated = local.as_ref().and_then(updated_at).unwrap_or("");
                let apply = local_updated.is_empty()
                    || updated_at(&row).is_some_and(|remote| remote > local_updated);
                if apply {
                    self.store.set_row(&binding.table, &id, row);
                    summary.applied += 1;
                }
            }
        }
        summary
    }

    /// Runs the synchronizer loop until `Stop` arrives or every handle is
    /// dropped.
    pub async fn run(mut self) -> SyncResult<()> {
        let mut changes_rx = self.store.subscribe(None);
        let mut changes_alive = true;
        let mut poll = tokio::time::interval_at(
            Instant::now() + self.poll_interval,
            self.poll_interval,
        );
        let mut debouncer = Debouncer::new(self.outbound_debounce);

        info!(tables = self.bindings.len(), "[RECORDS] record synchronizer started");

        loop {
            let next_flush = debouncer.next_deadline();
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(RecordSyncCommand::FlushNow { reply }) => {
                            debouncer.clear();
                            let summary = self.flush_all().await;
                            let _ = reply.send(summary);
                        }
                        Some(RecordSyncCommand::PollNow { reply }) => {
                            let summary = self.poll_pass().await;
                            Self::drain_change_echo(&mut changes_rx);
                            let _ = reply.send(summary);
                        }
                        Some(RecordSyncCommand::Stop) | None => break,
                    }
                }

                change = changes_rx.recv(), if changes_alive => {
                    match change {
                        Some(change) => self.note_row_change(&mut debouncer, change),
                        None => changes_alive = false,
                    }
                }

                _ = poll.tick() => {
                    let summary = self.poll_pass().await;
                    if !summary.errors.is_empty() {
                        warn!(errors = ?summary.errors, "[RECORDS] poll pass had errors");
                    }
                    Self::drain_change_echo(&mut changes_rx);
                }

                _ = tokio::time::sleep_until(next_flush.unwrap_or_else(Instant::now)),
                    if next_flush.is_some() =>
                {
                    for table in debouncer.take_due(Instant::now()) {
                        let summary = self.flush_table(&table).await;
                        if !summary.errors.is_empty() {
                            warn!(table = %table, errors = ?summary.errors, "[RECORDS] flush had errors");
                        }
                    }
                }
            }
        }

        info!("[RECORDS] record synchronizer stopped");
        Ok(())
    }

    fn note_row_change(&mut self, debouncer: &mut Debouncer, change: RowChange) {
        if self.binding(&change.table).is_none() {
            return;
        }
        if self.store.get_row(&change.table, &change.row_id).is_none() {
            if let Some(set) = self.pending_deletes.get_mut(&change.table) {
                set.insert(change.row_id);
            }
        }
        debouncer.schedule(change.table);
    }

    /// Drops row-change events produced by the poll's own writes so they do
    /// not flush straight back out.
    fn drain_change_echo(changes_rx: &mut mpsc::UnboundedReceiver<RowChange>) {
        while changes_rx.try_recv().is_ok() {}
    }
}
