use std::path::{Path, PathBuf};

use async_trait::async_trait;
use remote_agents_core::Activity;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::activity_store::ActivityStorage;
use crate::error::StorageError;
use crate::fsutil;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ActivityMetadata {
    activity_count: u64,
    last_synced_at: i64,
    high_water_mark: Option<String>,
}

/// jsonl-backed [`ActivityStorage`] for a single session.
///
/// New activities are appended in place; upserts (an `id` already present)
/// fall back to a full read-modify-rewrite of the log, since jsonl has no
/// random-access update. Every mutation is followed by an atomic rewrite
/// of the `metadata.json` sidecar.
pub struct LogActivityStorage {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl LogActivityStorage {
    /// `dir` is the session's own directory, e.g. `<cache_root>/cache/<sid>/`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Build the storage for `sid` rooted under a shared cache directory.
    #[must_use]
    pub fn for_session(cache_root: &Path, sid: &str) -> Self {
        Self::new(cache_root.join("cache").join(sid))
    }

    fn activities_path(&self) -> PathBuf {
        self.dir.join("activities.jsonl")
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join("metadata.json")
    }

    async fn write_metadata(&self, activities: &[Activity]) -> Result<(), StorageError> {
        let metadata = ActivityMetadata {
            activity_count: activities.len() as u64,
            last_synced_at: now_millis(),
            high_water_mark: activities.last().map(|a| a.create_time.clone()),
        };
        fsutil::atomic_write_json(&self.metadata_path(), &metadata).await
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[async_trait]
impl ActivityStorage for LogActivityStorage {
    async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, activity: Activity) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let path = self.activities_path();
        let mut existing: Vec<Activity> = fsutil::read_jsonl(&path).await?;
        match existing.iter().position(|a| a.id == activity.id) {
            Some(idx) => {
                existing[idx] = activity;
                fsutil::rewrite_jsonl(&path, &existing).await?;
            }
            None => {
                fsutil::append_jsonl_line(&path, &activity).await?;
                existing.push(activity);
            }
        }
        self.write_metadata(&existing).await
    }

    async fn get(&self, id: &str) -> Result<Option<Activity>, StorageError> {
        let existing: Vec<Activity> = fsutil::read_jsonl(&self.activities_path()).await?;
        Ok(existing.into_iter().find(|a| a.id == id))
    }

    async fn latest(&self) -> Result<Option<Activity>, StorageError> {
        let existing: Vec<Activity> = fsutil::read_jsonl(&self.activities_path()).await?;
        Ok(existing.into_iter().last())
    }

    async fn scan(&self) -> Result<Vec<Activity>, StorageError> {
        fsutil::read_jsonl(&self.activities_path()).await
    }

    async fn count(&self) -> Result<u64, StorageError> {
        if let Some(meta) = fsutil::read_json::<ActivityMetadata>(&self.metadata_path()).await? {
            return Ok(meta.activity_count);
        }
        Ok(self.scan().await?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use remote_agents_core::{ActivityType, Originator};
    use tempfile::tempdir;

    use super::*;

    fn activity(id: &str, create_time: &str) -> Activity {
        Activity {
            id: id.into(),
            create_time: create_time.into(),
            originator: Originator::Agent,
            activity_type: ActivityType::AgentMessaged {
                message: id.into(),
            },
            artifacts: vec![],
        }
    }

    #[tokio::test]
    async fn append_then_scan_preserves_order() {
        let dir = tempdir().unwrap();
        let store = LogActivityStorage::new(dir.path());
        store.init().await.unwrap();
        store.append(activity("a1", "t1")).await.unwrap();
        store.append(activity("a2", "t2")).await.unwrap();
        let scanned = store.scan().await.unwrap();
        assert_eq!(scanned.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn append_upserts_by_id_preserving_position() {
        let dir = tempdir().unwrap();
        let store = LogActivityStorage::new(dir.path());
        store.init().await.unwrap();
        store.append(activity("a1", "t1")).await.unwrap();
        store.append(activity("a2", "t2")).await.unwrap();
        let mut updated = activity("a1", "t1");
        updated.activity_type = ActivityType::AgentMessaged {
            message: "updated".into(),
        };
        store.append(updated).await.unwrap();

        let scanned = store.scan().await.unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].id, "a1");
        match &scanned[0].activity_type {
            ActivityType::AgentMessaged { message } => assert_eq!(message, "updated"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn latest_and_count_reflect_metadata_sidecar() {
        let dir = tempdir().unwrap();
        let store = LogActivityStorage::new(dir.path());
        store.init().await.unwrap();
        store.append(activity("a1", "t1")).await.unwrap();
        store.append(activity("a2", "t2")).await.unwrap();

        assert_eq!(store.latest().await.unwrap().unwrap().id, "a2");
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn conformance_suite() {
        let dir = tempdir().unwrap();
        crate::conformance::append_preserves_scan_order(&LogActivityStorage::new(
            dir.path().join("a"),
        ))
        .await;
        crate::conformance::append_same_id_is_idempotent_in_position(&LogActivityStorage::new(
            dir.path().join("b"),
        ))
        .await;
        crate::conformance::latest_tracks_last_append(&LogActivityStorage::new(dir.path().join("c")))
            .await;
        crate::conformance::get_reflects_upsert(&LogActivityStorage::new(dir.path().join("d")))
            .await;
    }

    #[tokio::test]
    async fn scan_skips_corrupt_lines() {
        let dir = tempdir().unwrap();
        let store = LogActivityStorage::new(dir.path());
        store.init().await.unwrap();
        store.append(activity("a1", "t1")).await.unwrap();
        tokio::fs::write(
            dir.path().join("activities.jsonl"),
            format!(
                "{}\nnot json\n",
                serde_json::to_string(&activity("a1", "t1")).unwrap()
            ),
        )
        .await
        .unwrap();

        let scanned = store.scan().await.unwrap();
        assert_eq!(scanned.len(), 1);
    }
}
