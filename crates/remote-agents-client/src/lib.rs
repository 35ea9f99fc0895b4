//! Session and client façades (spec.md §4.7, §4.8) over the activity
//! streaming engine and storage backends: the public surface a CLI, a
//! server or a UI embeds against.

mod client;
mod config;
mod run;
mod session;
mod sync;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use config::ClientConfig;
pub use run::RunHandle;
pub use session::{
    ActivitiesApi, ActivityListPage, ListOptions, SelectOptions, Session, SessionInsights,
    SessionResult, SessionSnapshot,
};
pub use sync::{SyncDepth, SyncOptions, SyncReport};

pub use remote_agents_core::api::CreateSessionRequest;
pub use remote_agents_engine::ActivityResult;
