//! System context rendering
//!
//! Builds the system prompt that anchors an assistant turn: which board it
//! is working against, which item the session is about, and where the
//! workflow currently stands.

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use crate::session::{Session, Stage, working_keys};

const SYSTEM_CONTEXT_TEMPLATE: &str = "\
You are a work-tracking assistant for the {{{organization}}} organization, \
project {{{project}}}.

The current conversation is about work item #{{item_id}}.
Workflow stage: {{stage}}.
{{#if has_specification}}A specification has been captured for this item.
{{else}}No specification exists yet; start with the specify tool.
{{/if}}{{#if has_plan}}An execution plan is stored and ready to execute.
{{/if}}
Use the provided tools to specify, plan, and execute work. Prefer asking \
clarifying questions over inventing requirements.";

/// Everything the system context template needs.
#[derive(Debug, Serialize)]
pub struct SystemContextInput {
    pub organization: String,
    pub project: String,
    pub item_id: i64,
    pub stage: String,
    pub has_specification: bool,
    pub has_plan: bool,
}

impl SystemContextInput {
    pub fn from_session(session: &Session, project: &str) -> Self {
        let stage = match session.stage {
            Stage::Idle => "idle",
            Stage::Specifying => "specifying",
            Stage::Planning => "planning",
            Stage::Executing => "executing",
        };
        Self {
            organization: session.key.organization.clone(),
            project: project.to_string(),
            item_id: session.key.item_id,
            stage: stage.to_string(),
            has_specification: session.working_data.contains_key(working_keys::SPECIFICATION),
            has_plan: session.working_data.contains_key(working_keys::EXECUTION_PLAN),
        }
    }
}

/// Render the system context for one session.
pub fn system_context(input: &SystemContextInput) -> Result<String> {
    debug!(item_id = input.item_id, stage = %input.stage, "system_context: called");
    Handlebars::new()
        .render_template(SYSTEM_CONTEXT_TEMPLATE, input)
        .map_err(|e| eyre!("Failed to render system context: {}", e))
}
