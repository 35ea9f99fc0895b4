use std::path::PathBuf;

use async_trait::async_trait;
use remote_agents_core::session::coalesce_index;
use remote_agents_core::{CachedSession, SessionIndexEntry};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::fsutil;
use crate::session_store::SessionStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct GlobalMetadata {
    last_synced_at: i64,
    session_count: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionActivityMetadata {
    #[serde(default)]
    activity_count: u64,
    #[serde(default)]
    last_synced_at: i64,
    #[serde(default)]
    high_water_mark: Option<String>,
}

/// jsonl-backed [`SessionStore`], rooted at `<cache_root>/cache/`.
pub struct LogSessionStorage {
    root: PathBuf,
    lock: Mutex<()>,
}

impl LogSessionStorage {
    #[must_use]
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            root: cache_root.into().join("cache"),
            lock: Mutex::new(()),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("sessions.jsonl")
    }

    fn global_metadata_path(&self) -> PathBuf {
        self.root.join("global-metadata.json")
    }

    fn session_dir(&self, sid: &str) -> PathBuf {
        self.root.join(sid)
    }

    fn session_path(&self, sid: &str) -> PathBuf {
        self.session_dir(sid).join("session.json")
    }

    fn activity_metadata_path(&self, sid: &str) -> PathBuf {
        self.session_dir(sid).join("metadata.json")
    }

    async fn read_activity_metadata(
        &self,
        sid: &str,
    ) -> Result<SessionActivityMetadata, StorageError> {
        Ok(fsutil::read_json(&self.activity_metadata_path(sid))
            .await?
            .unwrap_or_default())
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[async_trait]
impl SessionStore for LogSessionStorage {
    async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn upsert(&self, session: CachedSession) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        fsutil::atomic_write_json(&self.session_path(&session.resource.id), &session).await?;

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
        fsutil::append_jsonl_line(&self.index_path(), &entry).await?;

        let mut global: GlobalMetadata = fsutil::read_json(&self.global_metadata_path())
            .await?
            .unwrap_or_default();
        let rows: Vec<SessionIndexEntry> = fsutil::read_jsonl(&self.index_path()).await?;
        global.session_count = coalesce_index(rows).len() as u64;
        global.last_synced_at = now_millis();
        fsutil::atomic_write_json(&self.global_metadata_path(), &global).await
    }

    async fn get(&self, session_id: &str) -> Result<Option<CachedSession>, StorageError> {
        fsutil::read_json(&self.session_path(session_id)).await
    }

    async fn scan_index(&self) -> Result<Vec<SessionIndexEntry>, StorageError> {
        let rows: Vec<SessionIndexEntry> = fsutil::read_jsonl(&self.index_path()).await?;
        Ok(coalesce_index(rows))
    }

    async fn get_activity_high_water_mark(
        &self,
        session_id: &str,
    ) -> Result<Option<String>, StorageError> {
        Ok(self.read_activity_metadata(session_id).await?.high_water_mark)
    }

    async fn set_activity_high_water_mark(
        &self,
        session_id: &str,
        create_time: &str,
    ) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut meta = self.read_activity_metadata(session_id).await?;
        meta.high_water_mark = Some(create_time.to_string());
        meta.last_synced_at = now_millis();
        fsutil::atomic_write_json(&self.activity_metadata_path(session_id), &meta).await
    }

    async fn session_count(&self) -> Result<u64, StorageError> {
        if let Some(meta) = fsutil::read_json::<GlobalMetadata>(&self.global_metadata_path()).await? {
            return Ok(meta.session_count);
        }
        Ok(self.scan_index().await?.len() as u64)
    }

    async fn get_activity_count(&self, session_id: &str) -> Result<Option<u64>, StorageError> {
        let meta = self.read_activity_metadata(session_id).await?;
        if meta.activity_count > 0 {
            return Ok(Some(meta.activity_count));
        }
        Ok(None)
    }

    async fn set_activity_count(&self, session_id: &str, count: u64) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut meta = self.read_activity_metadata(session_id).await?;
        meta.activity_count = count;
        meta.last_synced_at = now_millis();
        fsutil::atomic_write_json(&self.activity_metadata_path(session_id), &meta).await
    }
}
