//! Reactive record-store seam (tables of JSON rows) and an in-memory
//! implementation with row-change notification.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A row was set or deleted. Look the row up to find out which.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowChange {
    pub table: String,
    pub row_id: String,
}

/// Key-value table store with change notification. Methods are synchronous;
/// the backing store is expected to be local and cheap.
pub trait RecordStore: Send + Sync {
    fn get_row(&self, table: &str, id: &str) -> Option<Value>;
    fn set_row(&self, table: &str, id: &str, row: Value);
    fn del_row(&self, table: &str, id: &str);
    fn list_rows(&self, table: &str) -> Vec<(String, Value)>;
    /// Subscribes to row changes for one table, or for all tables with `None`.
    fn subscribe(&self, table: Option<&str>) -> mpsc::UnboundedReceiver<RowChange>;
}

#[derive(Default)]
struct MemoryRecordStoreInner {
    tables: HashMap<String, BTreeMap<String, Value>>,
    listeners: Vec<(Option<String>, mpsc::UnboundedSender<RowChange>)>,
}

/// In-memory record store.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<MemoryRecordStoreInner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(inner: &mut MemoryRecordStoreInner, table: &str, id: &str) {
        inner.listeners.retain(|(filter, tx)| {
            if filter.as_deref().is_some_and(|t| t != table) {
                return !tx.is_closed();
            }
            tx.send(RowChange {
                table: table.to_string(),
                row_id: id.to_string(),
            })
            .is_ok()
        });
    }
}

impl RecordStore for MemoryRecordStore {
    fn get_row(&self, table: &str, id: &str) -> Option<Value> {
        self.inner
            .lock()
            .unwrap()
            .tables
            .get(table)
            .and_then(|rows| rows.get(id))
            .cloned()
    }

    fn set_row(&self, table: &str, id: &str, row: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), row);
        Self::notify(&mut inner, table, id);
    }

    fn del_row(&self, table: &str, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner
            .tables
            .get_mut(table)
            .and_then(|rows| rows.remove(id))
            .is_some();
        if removed {
            Self::notify(&mut inner, table, id);
        }
    }

    fn list_rows(&self, table: &str) -> Vec<(String, Value)> {
        self.inner
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    fn subscribe(&self, table: Option<&str>) -> mpsc::UnboundedReceiver<RowChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .lock()
            .unwrap()
            .listeners
            .push((table.map(str::to_string), tx));
        rx
    }
}
