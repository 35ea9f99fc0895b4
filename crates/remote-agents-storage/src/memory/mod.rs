//! In-process, seq-indexed backend standing in for a browser indexed
//! database: same `(sid, id)` keying as the log backend's jsonl files,
//! kept in a `BTreeMap` ordered by insertion sequence instead of on disk.

mod activity;
mod session;

pub use activity::MemoryActivityStorage;
pub use session::MemorySessionStorage;
