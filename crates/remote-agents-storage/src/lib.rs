//! Activity and session storage backends.
//!
//! Two implementations satisfy the same [`activity_store::ActivityStorage`]
//! and [`session_store::SessionStore`] contracts: [`log`] (an append-only
//! jsonl backend, the reference local-filesystem host) and [`memory`] (an
//! in-process backend standing in for a browser indexed database). Callers
//! select a backend once, at construction time, via a [`factory::StorageFactory`].

pub mod activity_store;
pub mod error;
pub mod factory;
pub mod session_store;

#[cfg(feature = "log")]
mod fsutil;

#[cfg(test)]
mod conformance;

#[cfg(feature = "log")]
pub mod log;

#[cfg(feature = "memory")]
pub mod memory;

pub use activity_store::ActivityStorage;
pub use error::StorageError;
pub use factory::StorageFactory;
pub use session_store::SessionStore;

#[cfg(feature = "log")]
pub use factory::LogStorageFactory;

#[cfg(feature = "memory")]
pub use factory::MemoryStorageFactory;

#[cfg(feature = "log")]
pub use log::{LogActivityStorage, LogSessionStorage};

#[cfg(feature = "memory")]
pub use memory::{MemoryActivityStorage, MemorySessionStorage};
