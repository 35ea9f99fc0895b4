//! The activity storage contract (spec §4.1), scoped to a single session.

use async_trait::async_trait;
use remote_agents_core::Activity;

use crate::error::StorageError;

/// Append-only, ordered, upsert-by-id store of activities for one session.
///
/// `append` is an upsert: a new `id` goes to the tail of scan order; an
/// existing `id` is replaced in place, preserving position. Implementations
/// must make `append` durable before it returns, and must never throw
/// mid-`scan` for a single corrupt record — corrupt records are logged and
/// skipped (best-effort replay).
#[async_trait]
pub trait ActivityStorage: Send + Sync {
    /// Idempotent; prepares the backing store. Must complete before any
    /// other call.
    async fn init(&self) -> Result<(), StorageError>;

    /// Releases handles. Behavior of other calls after `close` is
    /// unspecified.
    async fn close(&self) -> Result<(), StorageError>;

    /// Upsert by `a.id`.
    async fn append(&self, activity: Activity) -> Result<(), StorageError>;

    /// Bulk variant of [`ActivityStorage::append`], in order.
    async fn append_many(&self, activities: Vec<Activity>) -> Result<(), StorageError> {
        for activity in activities {
            self.append(activity).await?;
        }
        Ok(())
    }

    /// Point lookup.
    async fn get(&self, id: &str) -> Result<Option<Activity>, StorageError>;

    /// The last-inserted activity, or `None` if empty. Its
    /// `(create_time, id)` is the high-water mark for polling.
    async fn latest(&self) -> Result<Option<Activity>, StorageError>;

    /// All activities in insertion order. Finite; each call is a fresh,
    /// restartable traversal.
    async fn scan(&self) -> Result<Vec<Activity>, StorageError>;

    /// `O(1)` when a sidecar metadata record is present; falls back to
    /// `scan().len()` otherwise.
    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.scan().await?.len() as u64)
    }
}
