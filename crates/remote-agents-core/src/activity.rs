//! The activity data model: immutable events on a session's timeline.

use serde::{Deserialize, Serialize};

/// Who originated an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Originator {
    User,
    Agent,
    System,
}

/// A single plan step, part of a `planGenerated` activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// A generated plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

/// Per-file record within a `changeSet` artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub change_type: ChangeType,
    pub additions: u32,
    pub deletions: u32,
}

/// Auxiliary payload attached to an activity, in the order the Service sent
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Artifact {
    ChangeSet {
        unidiff_patch: String,
        files: Vec<FileChange>,
    },
    Media {
        mime_type: String,
        data: String,
    },
    BashOutput {
        command: String,
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
}

/// Tagged variant the engine and façades consume, after [`crate::mapper`]
/// has translated the Service's presence-of-field REST shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActivityType {
    AgentMessaged { message: String },
    UserMessaged { message: String },
    PlanGenerated { plan: Plan },
    PlanApproved { plan_id: String },
    ProgressUpdated { title: String, description: String },
    SessionCompleted,
    SessionFailed { reason: Option<String> },
}

/// An immutable event in a session's timeline.
///
/// `(create_time, id)` pairs are unique within a session's activity log;
/// `create_time` is non-decreasing in storage insertion order (see the
/// storage contract in `remote-agents-storage`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub create_time: String,
    pub originator: Originator,
    #[serde(flatten)]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl ActivityType {
    /// The wire tag for this variant, as used by `#[serde(tag = "type")]`.
    /// Used by callers that bucket activities by kind without pulling in
    /// the full serializer (e.g. `SessionSnapshot::activity_counts`).
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::AgentMessaged { .. } => "agentMessaged",
            Self::UserMessaged { .. } => "userMessaged",
            Self::PlanGenerated { .. } => "planGenerated",
            Self::PlanApproved { .. } => "planApproved",
            Self::ProgressUpdated { .. } => "progressUpdated",
            Self::SessionCompleted => "sessionCompleted",
            Self::SessionFailed { .. } => "sessionFailed",
        }
    }
}

impl Activity {
    /// `true` if this activity is `sessionCompleted` or `sessionFailed`.
    ///
    /// Per the invariant in spec §3, this does *not* mean the session has
    /// stopped producing activities — only session `state` determines
    /// terminal-ness. It is exposed for callers that want to surface the
    /// terminal event in a UI without waiting on `result()`.
    #[must_use]
    pub fn is_terminal_kind(&self) -> bool {
        matches!(
            self.activity_type,
            ActivityType::SessionCompleted | ActivityType::SessionFailed { .. }
        )
    }

    /// The `(create_time, id)` water mark pair used by the streaming engine.
    #[must_use]
    pub fn water_mark(&self) -> (&str, &str) {
        (&self.create_time, &self.id)
    }
}
