//! Session state for the specify / plan / execute workflow
//!
//! A session is the single source of truth for where one conversation is in
//! the workflow. Sessions are keyed by (organization, work item); creation
//! is idempotent and eagerly loads the item's context through the board
//! client.

mod manager;
mod messages;
mod store;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use boardclient::BoardApi;

pub use manager::SessionManager;
pub use messages::{SessionCommand, SessionError, SessionResponse};
pub use store::SessionStore;

/// Well-known working-data keys.
pub mod working_keys {
    /// Snapshot of item + children + related loaded at session creation.
    pub const ITEM_CONTEXT: &str = "item_context";
    /// Rendered specification document produced by the specify stage.
    pub const SPECIFICATION: &str = "specification";
    /// Specify stage state marker (`gathering` / `complete`).
    pub const SPECIFY_STATE: &str = "specify_state";
    /// Serialized `ExecutionPlan` awaiting execution.
    pub const EXECUTION_PLAN: &str = "execution_plan";
    /// Serialized `ExecutionResult` of the most recent execution.
    pub const LAST_EXECUTION_RESULT: &str = "last_execution_result";
}

/// Composite session identity: one live session per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub organization: String,
    pub item_id: i64,
}

/// Workflow phase the session is currently in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Idle,
    Specifying,
    Planning,
    Executing,
}

/// Speaker of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One entry in the ordered, append-only conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-conversation workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub key: SessionKey,
    pub stage: Stage,
    pub transcript: Vec<TranscriptEntry>,
    pub working_data: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            key,
            stage: Stage::Idle,
            transcript: Vec::new(),
            working_data: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// String-typed working-data value, if present.
    pub fn working_str(&self, key: &str) -> Option<&str> {
        self.working_data.get(key).and_then(Value::as_str)
    }
}

/// Partial changes merged into a session by `SessionStore::update`.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub stage: Option<Stage>,
    /// Keys merged into working data.
    pub working_data: HashMap<String, Value>,
    /// Keys removed after the merge.
    pub remove_keys: Vec<String>,
    /// Entries appended to the transcript.
    pub transcript: Vec<TranscriptEntry>,
}

impl SessionUpdate {
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.working_data.insert(key.to_string(), value);
        self
    }

    pub fn with_removal(mut self, key: &str) -> Self {
        self.remove_keys.push(key.to_string());
        self
    }

    pub fn with_transcript(mut self, role: Role, text: impl Into<String>) -> Self {
        self.transcript.push(TranscriptEntry {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        });
        self
    }
}

/// Get-or-create a session for `key`, loading item context through the
/// client on first creation.
///
/// Idempotent: an existing session for the key is returned untouched, and a
/// concurrent create racing on the same key resolves to whichever session
/// landed first. A failed context load propagates without leaving a partial
/// session behind.
pub async fn get_or_create(
    manager: &SessionManager,
    api: &dyn BoardApi,
    key: SessionKey,
) -> Result<Session, SessionError> {
    debug!(organization = %key.organization, item_id = key.item_id, "get_or_create: called");
    if let Some(existing) = manager.get_by_key(&key).await? {
        debug!(session_id = %existing.id, "get_or_create: returning existing session");
        return Ok(existing);
    }

    let item = api.get_item(key.item_id).await?;
    let children = api.get_children(key.item_id).await?;
    let related = api.get_related(key.item_id).await?;

    let mut session = Session::new(key);
    session.working_data.insert(
        working_keys::ITEM_CONTEXT.to_string(),
        json!({
            "item": item,
            "child_count": children.len(),
            "child_titles": children.iter().map(|c| c.title().to_string()).collect::<Vec<_>>(),
            "related_count": related.len(),
        }),
    );

    manager.create(session).await
}
