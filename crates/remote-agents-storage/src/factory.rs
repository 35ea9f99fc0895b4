//! Binds a [`SessionStore`] to a per-session [`ActivityStorage`]
//! constructor, so the engine and client façade can stay oblivious to
//! which concrete backend is in play.

use std::path::PathBuf;
use std::sync::Arc;

use crate::activity_store::ActivityStorage;
use crate::session_store::SessionStore;

/// A storage backend, bundling session metadata storage with the ability
/// to open the activity store for any given session.
pub trait StorageFactory: Send + Sync {
    fn session_store(&self) -> Arc<dyn SessionStore>;
    fn activity_store(&self, session_id: &str) -> Arc<dyn ActivityStorage>;
}

/// Factory over the jsonl log backend, rooted at `cache_root`.
#[cfg(feature = "log")]
pub struct LogStorageFactory {
    cache_root: PathBuf,
    session_store: Arc<dyn SessionStore>,
}

#[cfg(feature = "log")]
impl LogStorageFactory {
    #[must_use]
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        let cache_root = cache_root.into();
        Self {
            session_store: Arc::new(crate::log::LogSessionStorage::new(cache_root.clone())),
            cache_root,
        }
    }
}

#[cfg(feature = "log")]
impl StorageFactory for LogStorageFactory {
    fn session_store(&self) -> Arc<dyn SessionStore> {
        self.session_store.clone()
    }

    fn activity_store(&self, session_id: &str) -> Arc<dyn ActivityStorage> {
        Arc::new(crate::log::LogActivityStorage::for_session(
            &self.cache_root,
            session_id,
        ))
    }
}

/// Factory over the in-process backend, standing in for an
/// indexed-database host.
#[cfg(feature = "memory")]
pub struct MemoryStorageFactory {
    session_store: Arc<dyn SessionStore>,
    activity_stores: std::sync::Mutex<std::collections::HashMap<String, Arc<dyn ActivityStorage>>>,
}

#[cfg(feature = "memory")]
impl Default for MemoryStorageFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "memory")]
impl MemoryStorageFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_store: Arc::new(crate::memory::MemorySessionStorage::new()),
            activity_stores: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(feature = "memory")]
impl StorageFactory for MemoryStorageFactory {
    fn session_store(&self) -> Arc<dyn SessionStore> {
        self.session_store.clone()
    }

    fn activity_store(&self, session_id: &str) -> Arc<dyn ActivityStorage> {
        let mut stores = self
            .activity_stores
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        stores
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(crate::memory::MemoryActivityStorage::new()))
            .clone()
    }
}
