//! The activity streaming engine.
//!
//! Turns a session's paginated REST activity list into three
//! [`futures::Stream`]s — [`ActivityEngine::history`],
//! [`ActivityEngine::updates`], [`ActivityEngine::stream`] — backed by the
//! eventual-consistency retry policy and the local activity store from
//! `remote-agents-core`/`remote-agents-storage`.

mod cursor;
mod engine;

pub use engine::{ActivityEngine, ActivityResult};
