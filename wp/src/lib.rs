//! Workpilot - session-bound workflow orchestrator for a work-item tracker
//!
//! Drives a three-stage workflow (specify, plan, execute) against a
//! work-item tracking backend. Each conversation holds a session keyed by
//! (organization, work item); stages read and mutate that session's state,
//! and all backend traffic flows through the resilient `boardclient` layer.
//!
//! # Modules
//!
//! - [`session`] - per-conversation state: store, actor manager, lifecycle
//! - [`stages`] - specify, plan, and execute stage implementations
//! - [`agent`] - surface exposed to the language-model runtime (tool
//!   schemas, system context, stream event shape)
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod session;
pub mod stages;

// Re-export commonly used types
pub use agent::{AgentEvent, ToolDefinition, builtin_tools, system_context};
pub use config::{BackendConfig, Config, ExecutionConfig};
pub use session::{
    Role, Session, SessionError, SessionKey, SessionManager, SessionUpdate, Stage, TranscriptEntry, get_or_create,
    working_keys,
};
pub use stages::{
    CreatedTask, ExecuteOptions, ExecuteStage, ExecutionPlan, ExecutionResult, FailedTask, PlanStage, SpecifyOutcome,
    SpecifyStage, SpecifyState, StageError, SubtaskDescriptor,
};
