//! Agent surface: events, tool definitions, and system context
//!
//! This is the conversational face of the workflow. Tool definitions
//! describe the operations an assistant may invoke; events are the units a
//! frontend consumes while a turn is streaming.

mod context;
mod tools;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use context::{SystemContextInput, system_context};
pub use tools::{ToolDefinition, builtin_tools};

/// One unit of agent output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A fragment of assistant text.
    TextDelta { text: String },
    /// The assistant asked for a tool to be run.
    ToolInvocation { name: String, input: Value },
    /// The turn is finished.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_tag_by_type() {
        let event = AgentEvent::ToolInvocation {
            name: "plan".to_string(),
            input: json!({"item": 7}),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "tool_invocation");
        assert_eq!(value["name"], "plan");
    }

    #[test]
    fn test_done_roundtrips() {
        let value = serde_json::to_value(AgentEvent::Done).unwrap();
        let event: AgentEvent = serde_json::from_value(value).unwrap();
        assert!(matches!(event, AgentEvent::Done));
    }
}
