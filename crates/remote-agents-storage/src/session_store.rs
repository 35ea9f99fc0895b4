//! The session metadata storage contract (spec §4.2).

use async_trait::async_trait;
use remote_agents_core::{CachedSession, SessionIndexEntry};

use crate::error::StorageError;

/// Metadata store for session resources plus the append-only index used
/// for listing.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Idempotent; prepares the backing store.
    async fn init(&self) -> Result<(), StorageError>;

    /// Write the per-session record and append a row to the index.
    async fn upsert(&self, session: CachedSession) -> Result<(), StorageError>;

    /// Bulk variant of [`SessionStore::upsert`].
    async fn upsert_many(&self, sessions: Vec<CachedSession>) -> Result<(), StorageError> {
        for session in sessions {
            self.upsert(session).await?;
        }
        Ok(())
    }

    /// The latest cached record for a session, if any.
    async fn get(&self, session_id: &str) -> Result<Option<CachedSession>, StorageError>;

    /// All index rows, coalesced to the newest row per id (see
    /// [`remote_agents_core::session::coalesce_index`]).
    async fn scan_index(&self) -> Result<Vec<SessionIndexEntry>, StorageError>;

    /// The last seen `create_time` for a session's activities, or `None`.
    async fn get_activity_high_water_mark(
        &self,
        session_id: &str,
    ) -> Result<Option<String>, StorageError>;

    /// Record a new high-water mark for a session's activities, used by
    /// the streaming engine after each persisted activity.
    async fn set_activity_high_water_mark(
        &self,
        session_id: &str,
        create_time: &str,
    ) -> Result<(), StorageError>;

    /// `O(1)` when the global metadata sidecar is present.
    async fn session_count(&self) -> Result<u64, StorageError>;

    /// `O(1)` when a per-session metadata sidecar is present; otherwise a
    /// full scan of the session's activity store.
    async fn get_activity_count(&self, session_id: &str) -> Result<Option<u64>, StorageError>;

    /// Record the activity count for a session, used after sync writes.
    async fn set_activity_count(&self, session_id: &str, count: u64) -> Result<(), StorageError>;
}
