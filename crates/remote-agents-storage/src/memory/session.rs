use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use remote_agents_core::session::coalesce_index;
use remote_agents_core::{CachedSession, SessionIndexEntry};

use crate::error::StorageError;
use crate::session_store::SessionStore;

#[derive(Default)]
struct SessionActivityMetadata {
    activity_count: Option<u64>,
    high_water_mark: Option<String>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, CachedSession>,
    /// Append-only index rows, mirroring the log backend's `sessions.jsonl`.
    index_rows: Vec<SessionIndexEntry>,
    activity_metadata: HashMap<String, SessionActivityMetadata>,
}

/// In-process [`SessionStore`] standing in for the indexed-database host.
pub struct MemorySessionStorage {
    inner: Mutex<Inner>,
}

impl Default for MemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStorage {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn upsert(&self, session: CachedSession) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let entry = SessionIndexEntry {
            id: session.resource.id.clone(),
            title: session.resource.title.clone(),
            state: session.resource.state,
            create_time: session.resource.create_time.clone(),
            source: session.resource.source_context.clone(),
            updated_at: session.last_synced_at,
            activity_count: None,
            activity_high_water_mark: None,
        };
        inner.index_rows.push(entry);
        inner.sessions.insert(session.resource.id.clone(), session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<CachedSession>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.sessions.get(session_id).cloned())
    }

    async fn scan_index(&self) -> Result<Vec<SessionIndexEntry>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(coalesce_index(inner.index_rows.iter().cloned()))
    }

    async fn get_activity_high_water_mark(
        &self,
        session_id: &str,
    ) -> Result<Option<String>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .activity_metadata
            .get(session_id)
            .and_then(|m| m.high_water_mark.clone()))
    }

    async fn set_activity_high_water_mark(
        &self,
        session_id: &str,
        create_time: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .activity_metadata
            .entry(session_id.to_string())
            .or_default()
            .high_water_mark = Some(create_time.to_string());
        Ok(())
    }

    async fn session_count(&self) -> Result<u64, StorageError> {
        Ok(self.scan_index().await?.len() as u64)
    }

    async fn get_activity_count(&self, session_id: &str) -> Result<Option<u64>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .activity_metadata
            .get(session_id)
            .and_then(|m| m.activity_count))
    }

    async fn set_activity_count(&self, session_id: &str, count: u64) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .activity_metadata
            .entry(session_id.to_string())
            .or_default()
            .activity_count = Some(count);
        Ok(())
    }
}
