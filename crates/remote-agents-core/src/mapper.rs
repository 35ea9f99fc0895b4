//! Maps the Service's presence-of-field REST payloads onto the tagged
//! [`Activity`]/[`Artifact`] variants the rest of the core consumes.
//!
//! The REST API selects a variant by which sibling field is present rather
//! than by an explicit tag. The detection order below is fixed so it stays
//! stable across API evolutions (spec.md §9's "union-shaped REST payloads"
//! hint) — new fields added to the payload never change which existing
//! variant an activity maps to.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::activity::{
    Activity, ActivityType, Artifact, ChangeType, FileChange, Originator, Plan, PlanStep,
};

/// Raised when a REST activity or artifact doesn't match any known shape.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MapError(pub String);

#[derive(Debug, Deserialize)]
struct RawPlanStep {
    id: String,
    title: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    steps: Vec<RawPlanStep>,
}

#[derive(Debug, Deserialize)]
struct RawChangeSet {
    #[serde(rename = "gitPatch")]
    git_patch: RawGitPatch,
    #[serde(default)]
    files: Vec<RawFileChange>,
}

#[derive(Debug, Deserialize)]
struct RawGitPatch {
    #[serde(rename = "unidiffPatch")]
    unidiff_patch: String,
}

#[derive(Debug, Deserialize)]
struct RawFileChange {
    path: String,
    #[serde(rename = "changeType")]
    change_type: String,
    additions: u32,
    deletions: u32,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct RawBashOutput {
    command: String,
    stdout: String,
    stderr: String,
    #[serde(rename = "exitCode")]
    exit_code: i32,
}

#[derive(Debug, Deserialize)]
struct RawArtifact {
    #[serde(rename = "changeSet", default)]
    change_set: Option<RawChangeSet>,
    #[serde(default)]
    media: Option<RawMedia>,
    #[serde(rename = "bashOutput", default)]
    bash_output: Option<RawBashOutput>,
}

#[derive(Debug, Deserialize)]
struct RawAgentMessaged {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawUserMessaged {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawPlanApproved {
    #[serde(rename = "planId")]
    plan_id: String,
}

#[derive(Debug, Deserialize)]
struct RawProgressUpdated {
    title: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawSessionFailed {
    #[serde(default)]
    reason: Option<String>,
}

/// The raw REST shape for a single activity.
#[derive(Debug, Deserialize)]
pub struct RawActivity {
    name: String,
    #[serde(rename = "createTime")]
    create_time: String,
    #[serde(default)]
    originator: Option<String>,
    #[serde(rename = "agentMessaged", default)]
    agent_messaged: Option<RawAgentMessaged>,
    #[serde(rename = "userMessaged", default)]
    user_messaged: Option<RawUserMessaged>,
    #[serde(rename = "planGenerated", default)]
    plan_generated: Option<RawPlan>,
    #[serde(rename = "planApproved", default)]
    plan_approved: Option<RawPlanApproved>,
    #[serde(rename = "progressUpdated", default)]
    progress_updated: Option<RawProgressUpdated>,
    #[serde(rename = "sessionCompleted", default)]
    session_completed: Option<Value>,
    #[serde(rename = "sessionFailed", default)]
    session_failed: Option<RawSessionFailed>,
    #[serde(default)]
    artifacts: Vec<RawArtifact>,
}

fn map_artifact(raw: RawArtifact) -> Result<Artifact, MapError> {
    if let Some(cs) = raw.change_set {
        let files = cs
            .files
            .into_iter()
            .map(|f| {
                let change_type = match f.change_type.as_str() {
                    "created" => ChangeType::Created,
                    "modified" => ChangeType::Modified,
                    "deleted" => ChangeType::Deleted,
                    other => return Err(MapError(format!("unknown changeType: {other}"))),
                };
                Ok(FileChange {
                    path: f.path,
                    change_type,
                    additions: f.additions,
                    deletions: f.deletions,
                })
            })
            .collect::<Result<Vec<_>, MapError>>()?;
        return Ok(Artifact::ChangeSet {
            unidiff_patch: cs.git_patch.unidiff_patch,
            files,
        });
    }
    if let Some(media) = raw.media {
        return Ok(Artifact::Media {
            mime_type: media.mime_type,
            data: media.data,
        });
    }
    if let Some(bash) = raw.bash_output {
        return Ok(Artifact::BashOutput {
            command: bash.command,
            stdout: bash.stdout,
            stderr: bash.stderr,
            exit_code: bash.exit_code,
        });
    }
    Err(MapError("artifact has no recognized variant field".into()))
}

/// Last path segment of a resource `name`, e.g. `sessions/s1/activities/a1`
/// -> `a1`.
fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Map one REST activity into the tagged [`Activity`] the rest of the core
/// consumes.
///
/// Detection order is fixed: `agentMessaged`, `userMessaged`,
/// `planGenerated`, `planApproved`, `progressUpdated`, `sessionCompleted`,
/// `sessionFailed`. The first present field wins.
pub fn map_activity(raw: RawActivity) -> Result<Activity, MapError> {
    let id = last_segment(&raw.name).to_string();
    let originator = match raw.originator.as_deref() {
        Some("user") => Originator::User,
        Some("agent") => Originator::Agent,
        Some("system") | None => Originator::System,
        Some(other) => return Err(MapError(format!("unknown originator: {other}"))),
    };

    let activity_type = if let Some(m) = raw.agent_messaged {
        ActivityType::AgentMessaged { message: m.message }
    } else if let Some(m) = raw.user_messaged {
        ActivityType::UserMessaged { message: m.message }
    } else if let Some(p) = raw.plan_generated {
        ActivityType::PlanGenerated {
            plan: Plan {
                steps: p
                    .steps
                    .into_iter()
                    .map(|s| PlanStep {
                        id: s.id,
                        title: s.title,
                        description: s.description,
                    })
                    .collect(),
            },
        }
    } else if let Some(p) = raw.plan_approved {
        ActivityType::PlanApproved { plan_id: p.plan_id }
    } else if let Some(p) = raw.progress_updated {
        ActivityType::ProgressUpdated {
            title: p.title,
            description: p.description,
        }
    } else if raw.session_completed.is_some() {
        ActivityType::SessionCompleted
    } else if let Some(f) = raw.session_failed {
        ActivityType::SessionFailed { reason: f.reason }
    } else {
        return Err(MapError(format!(
            "activity {id} has no recognized type field"
        )));
    };

    let artifacts = raw
        .artifacts
        .into_iter()
        .map(map_artifact)
        .collect::<Result<Vec<_>, MapError>>()?;

    Ok(Activity {
        id,
        create_time: raw.create_time,
        originator,
        activity_type,
        artifacts,
    })
}

/// Parse and map a single JSON activity record in one step. Used by
/// storage scans and the engine's page handling alike.
pub fn map_activity_json(value: &Value) -> Result<Activity, MapError> {
    let raw: RawActivity =
        serde_json::from_value(value.clone()).map_err(|e| MapError(e.to_string()))?;
    map_activity(raw)
}
