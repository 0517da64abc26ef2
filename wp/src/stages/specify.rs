//! Specify stage: turn a thin work item into a specification
//!
//! The stage inspects the item's description and any answers the user has
//! supplied. While information is missing it emits clarifying questions and
//! leaves the session untouched; once enough exists it renders a markdown
//! specification and stores it in session working data.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use boardclient::{BoardApi, WorkItem};

use crate::session::{Role, SessionManager, SessionUpdate, Stage, working_keys};
use crate::stages::StageError;

/// A description at least this long counts as sufficient on its own.
pub const MIN_DESCRIPTION_LEN: usize = 100;

/// Topics an answer can address, in the order they render into the
/// specification.
pub const ANSWER_TOPICS: [&str; 5] = [
    "scenarios",
    "stakeholders",
    "reproduction",
    "acceptance",
    "constraints",
];

/// Where the specify stage stands for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecifyState {
    Gathering,
    Complete,
}

impl SpecifyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecifyState::Gathering => "gathering",
            SpecifyState::Complete => "complete",
        }
    }
}

/// Result of one specify round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecifyOutcome {
    pub state: SpecifyState,
    pub needs_more_info: bool,
    /// Non-empty exactly when `needs_more_info` is true.
    pub clarifying_questions: Vec<String>,
    pub specification: Option<String>,
}

/// Runs the specify stage against a session and its work item.
pub struct SpecifyStage {
    api: Arc<dyn BoardApi>,
    sessions: SessionManager,
}

impl SpecifyStage {
    pub fn new(api: Arc<dyn BoardApi>, sessions: SessionManager) -> Self {
        Self { api, sessions }
    }

    /// Run one specify round.
    ///
    /// With too little information the outcome carries clarifying questions
    /// and no session mutation happens, so re-running with the same input is
    /// harmless. With enough information the rendered specification is
    /// stored and the session moves to `Specifying`.
    pub async fn run(
        &self,
        session_id: &str,
        item_id: i64,
        answers: &HashMap<String, String>,
    ) -> Result<SpecifyOutcome, StageError> {
        debug!(%session_id, item_id, answer_count = answers.len(), "run: called");
        let session = self.sessions.get_required(session_id).await?;

        let item = self
            .api
            .get_item(item_id)
            .await
            .map_err(StageError::Specification)?;
        let children = self
            .api
            .get_children(item_id)
            .await
            .map_err(StageError::Specification)?;
        let related = self
            .api
            .get_related(item_id)
            .await
            .map_err(StageError::Specification)?;

        if !is_complete(&item, answers) {
            let questions = clarifying_questions(item.item_type(), answers);
            info!(
                item_id,
                question_count = questions.len(),
                "run: gathering, returning clarifying questions"
            );
            return Ok(SpecifyOutcome {
                state: SpecifyState::Gathering,
                needs_more_info: true,
                clarifying_questions: questions,
                specification: None,
            });
        }

        let specification = render_specification(&item, answers, children.len(), related.len());
        let update = SessionUpdate::default()
            .with_stage(Stage::Specifying)
            .with_value(working_keys::SPECIFICATION, json!(specification.clone()))
            .with_value(
                working_keys::SPECIFY_STATE,
                json!(SpecifyState::Complete.as_str()),
            )
            .with_transcript(Role::Agent, format!("Specification captured for #{item_id}"));
        self.sessions
            .update(&session.id, update)
            .await?
            .ok_or_else(|| StageError::SessionNotFound(session.id.clone()))?;

        info!(item_id, "run: specification complete");
        Ok(SpecifyOutcome {
            state: SpecifyState::Complete,
            needs_more_info: false,
            clarifying_questions: Vec::new(),
            specification: Some(specification),
        })
    }
}

/// An item is specifiable once its description alone is substantial, or the
/// user has answered at least one clarifying question.
fn is_complete(item: &WorkItem, answers: &HashMap<String, String>) -> bool {
    item.description().trim().len() >= MIN_DESCRIPTION_LEN || !answers.is_empty()
}

/// Questions for the topics not yet answered, tailored to the item type.
fn clarifying_questions(item_type: &str, answers: &HashMap<String, String>) -> Vec<String> {
    let wanted: &[&str] = match item_type.to_lowercase().as_str() {
        "bug" => &["reproduction", "scenarios", "acceptance", "constraints"],
        "feature" | "epic" => &["scenarios", "stakeholders", "acceptance", "constraints"],
        "user story" => &["scenarios", "acceptance"],
        _ => &["scenarios", "acceptance", "constraints"],
    };

    wanted
        .iter()
        .filter(|topic| !answers.contains_key(**topic))
        .map(|topic| question_for(topic))
        .collect()
}

fn question_for(topic: &str) -> String {
    match topic {
        "scenarios" => "What are the main usage scenarios this should cover?".to_string(),
        "stakeholders" => "Who are the stakeholders and primary users?".to_string(),
        "reproduction" => "What are the exact steps to reproduce the problem?".to_string(),
        "acceptance" => "What acceptance criteria define this as done?".to_string(),
        "constraints" => "Are there technical or scheduling constraints to respect?".to_string(),
        other => format!("Can you elaborate on {other}?"),
    }
}

/// Renders the specification markdown. Answered topics appear in the fixed
/// `ANSWER_TOPICS` order regardless of map iteration order.
fn render_specification(
    item: &WorkItem,
    answers: &HashMap<String, String>,
    child_count: usize,
    related_count: usize,
) -> String {
    let mut doc = format!(
        "# Specification: {}\n\n**Type:** {}\n\n## Description\n\n{}\n",
        item.title(),
        item.item_type(),
        item.description().trim(),
    );

    for topic in ANSWER_TOPICS {
        if let Some(answer) = answers.get(topic) {
            let heading = {
                let mut chars = topic.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            };
            doc.push_str(&format!("\n## {heading}\n\n{answer}\n"));
        }
    }

    doc.push_str(&format!(
        "\n---\n*Context: {child_count} existing child item(s), {related_count} related item(s).*\n"
    ));
    doc
}
