//! Tool definitions exposed to the assistant
//!
//! Each definition carries a JSON Schema for its input. The set mirrors the
//! workflow stages plus the direct board operations an assistant needs when
//! a conversation steps outside the scripted flow.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

/// A tool the assistant may invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        let name = name.into();
        debug!(%name, "ToolDefinition::new: called");
        Self {
            name,
            description: description.into(),
            input_schema,
        }
    }

    /// Wire-format representation for a completion request.
    pub fn to_schema(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema,
        })
    }
}

/// The built-in tool set, in stable order.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    debug!("builtin_tools: called");
    vec![
        ToolDefinition::new(
            "specify",
            "Gather or finalize a specification for a work item. Returns clarifying \
             questions while information is missing.",
            json!({
                "type": "object",
                "properties": {
                    "item": {"type": "integer", "description": "Work item id"},
                    "answers": {
                        "type": "object",
                        "description": "Topic to answer text, for previously asked questions",
                        "additionalProperties": {"type": "string"}
                    }
                },
                "required": ["item"]
            }),
        ),
        ToolDefinition::new(
            "plan",
            "Decompose a specified work item into subtasks with estimates and dependencies.",
            json!({
                "type": "object",
                "properties": {
                    "item": {"type": "integer", "description": "Work item id"},
                    "approach": {
                        "type": "string",
                        "description": "Optional approach hint, e.g. 'tdd' or 'spike'"
                    }
                },
                "required": ["item"]
            }),
        ),
        ToolDefinition::new(
            "execute",
            "Create the planned subtasks in the backend, in rate-limited batches.",
            json!({
                "type": "object",
                "properties": {
                    "item": {"type": "integer", "description": "Work item id"},
                    "dry_run": {"type": "boolean", "description": "Preview without creating"},
                    "batch_size": {"type": "integer", "minimum": 1}
                },
                "required": ["item"]
            }),
        ),
        ToolDefinition::new(
            "create_work_item",
            "Create a single work item directly.",
            json!({
                "type": "object",
                "properties": {
                    "item_type": {"type": "string", "description": "e.g. Task, Bug, Feature"},
                    "title": {"type": "string"},
                    "description": {"type": "string"}
                },
                "required": ["item_type", "title"]
            }),
        ),
        ToolDefinition::new(
            "update_work_item",
            "Update fields on an existing work item.",
            json!({
                "type": "object",
                "properties": {
                    "item": {"type": "integer", "description": "Work item id"},
                    "fields": {
                        "type": "object",
                        "description": "Field reference name to new value",
                        "additionalProperties": true
                    }
                },
                "required": ["item", "fields"]
            }),
        ),
        ToolDefinition::new(
            "search_work_items",
            "Run a WIQL query and return the matching work items.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "WIQL query text"}
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::new(
            "link_work_items",
            "Attach a child work item under a parent.",
            json!({
                "type": "object",
                "properties": {
                    "parent": {"type": "integer"},
                    "child": {"type": "integer"}
                },
                "required": ["parent", "child"]
            }),
        ),
    ]
}
