//! Workflow stages: specify, plan, execute
//!
//! Each stage reads the session, talks to the backend through `BoardApi`,
//! and records its outcome back into session working data. Stages never
//! leave a session half-mutated: backend failures surface before any state
//! is written.

mod execute;
mod plan;
mod specify;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use boardclient::ClientError;

use crate::session::SessionError;

pub use execute::{ExecuteOptions, ExecuteStage};
pub use plan::{PlanStage, StrategyInput};
pub use specify::{MIN_DESCRIPTION_LEN, SpecifyOutcome, SpecifyStage, SpecifyState};

/// Placeholder used when planning runs without a stored specification.
pub const MISSING_SPECIFICATION: &str = "No specification has been captured for this item yet.";

/// Errors from workflow stages.
///
/// Partial batch failure during execution is NOT an error: it comes back as
/// a normal `ExecutionResult` with `success = false`. Errors here are
/// conditions that prevent a stage from running at all.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("no execution plan found, run planning first")]
    PlanNotFound,

    #[error("specification failed: {0}")]
    Specification(#[source] ClientError),

    #[error("planning failed: {0}")]
    Planning(#[source] ClientError),

    #[error("execution failed: {0}")]
    Execution(#[source] ClientError),

    #[error("stage state could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Session(SessionError),
}

impl From<SessionError> for StageError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotFound(id) => StageError::SessionNotFound(id),
            other => StageError::Session(other),
        }
    }
}

/// A planned-but-not-yet-created record.
///
/// `depends_on` references other descriptors by their stable `key`, never by
/// position; positions are resolved only at consumption time so filtering or
/// appending descriptors cannot silently repoint a dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskDescriptor {
    pub key: String,
    pub title: String,
    pub description: String,
    /// Target record type in the backend.
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// Ordered decomposition of one parent item, stored in session working data
/// between the plan and execute stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub parent_id: i64,
    /// Parent title at planning time.
    pub parent_title: String,
    pub subtasks: Vec<SubtaskDescriptor>,
    /// Sum of estimates over the surviving (non-duplicate) descriptors.
    pub estimated_effort: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ExecutionPlan {
    /// Positional dependency indices, one list per subtask, resolved against
    /// the current subtask order. References to descriptors no longer in the
    /// plan resolve to nothing rather than to the wrong element.
    pub fn resolved_dependencies(&self) -> Vec<Vec<usize>> {
        let index: HashMap<&str, usize> = self
            .subtasks
            .iter()
            .enumerate()
            .map(|(i, subtask)| (subtask.key.as_str(), i))
            .collect();
        self.subtasks
            .iter()
            .map(|subtask| {
                subtask
                    .depends_on
                    .iter()
                    .filter_map(|key| index.get(key.as_str()).copied())
                    .collect()
            })
            .collect()
    }
}

/// Outcome of one execute run. `created.len() + failed.len() == total` for
/// every non-dry run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub dry_run: bool,
    pub total: usize,
    pub created: Vec<CreatedTask>,
    pub failed: Vec<FailedTask>,
}

/// A successfully created record. `index` is the position in the whole plan,
/// not within the chunk. A populated `link_error` means the record exists
/// but the parent link could not be attached (soft failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTask {
    pub index: usize,
    pub title: String,
    pub id: i64,
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    pub index: usize,
    pub title: String,
    pub error: String,
}
