//! Append-only jsonl backend: the reference, local-filesystem host.
//!
//! Layout rooted at `<cache_root>/cache/`, matching the Service's on-disk
//! format: `sessions.jsonl`, `global-metadata.json`, and per-session
//! `<sid>/session.json`, `<sid>/activities.jsonl`, `<sid>/metadata.json`.

mod activity;
mod session;

pub use activity::LogActivityStorage;
pub use session::LogSessionStorage;
