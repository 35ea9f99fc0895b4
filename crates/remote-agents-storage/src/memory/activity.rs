use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use remote_agents_core::Activity;

use crate::activity_store::ActivityStorage;
use crate::error::StorageError;

#[derive(Default)]
struct Inner {
    /// `seq -> activity`, the insertion-ordered object store.
    rows: BTreeMap<u64, Activity>,
    /// `id -> seq`, the `(sid, id)` index (the session is implicit: one
    /// `MemoryActivityStorage` per session).
    index: HashMap<String, u64>,
    next_seq: u64,
}

/// In-process [`ActivityStorage`] for a single session.
pub struct MemoryActivityStorage {
    inner: Mutex<Inner>,
}

impl Default for MemoryActivityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryActivityStorage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

#[async_trait]
impl ActivityStorage for MemoryActivityStorage {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, activity: Activity) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&seq) = inner.index.get(&activity.id) {
            inner.rows.insert(seq, activity);
        } else {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.index.insert(activity.id.clone(), seq);
            inner.rows.insert(seq, activity);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Activity>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .index
            .get(id)
            .and_then(|seq| inner.rows.get(seq))
            .cloned())
    }

    async fn latest(&self) -> Result<Option<Activity>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.rows.values().next_back().cloned())
    }

    async fn scan(&self) -> Result<Vec<Activity>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.rows.values().cloned().collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.rows.len() as u64)
    }
}
