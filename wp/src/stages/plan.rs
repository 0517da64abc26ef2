//! Plan stage: decompose a specified item into subtasks
//!
//! Decomposition is a pure function of the item and its specification,
//! chosen from a strategy table keyed by item type. The user's approach hint
//! can append extra descriptors. Descriptors whose titles already exist as
//! children are filtered out before the plan is stored, and the effort total
//! is recomputed over the survivors.

use std::sync::Arc;

use tracing::{debug, info};

use boardclient::{BoardApi, WorkItem};

use crate::session::{Role, SessionManager, SessionUpdate, Stage, working_keys};
use crate::stages::{ExecutionPlan, MISSING_SPECIFICATION, StageError, SubtaskDescriptor};

/// What a decomposition strategy gets to look at.
pub struct StrategyInput<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub specification: &'a str,
}

/// A strategy maps one parent item onto a list of subtask descriptors.
type DecompositionStrategy = fn(&StrategyInput) -> Vec<SubtaskDescriptor>;

/// Item-type dispatch table. Lookup is case-insensitive; unknown types fall
/// back to the generic strategy.
const STRATEGIES: [(&str, DecompositionStrategy); 4] = [
    ("feature", feature_strategy),
    ("epic", feature_strategy),
    ("user story", story_strategy),
    ("bug", bug_strategy),
];

fn strategy_for(item_type: &str) -> DecompositionStrategy {
    let wanted = item_type.to_lowercase();
    STRATEGIES
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, strategy)| *strategy)
        .unwrap_or(generic_strategy)
}

fn descriptor(
    key: &str,
    title: String,
    description: String,
    estimate: f64,
    depends_on: &[&str],
) -> SubtaskDescriptor {
    SubtaskDescriptor {
        key: key.to_string(),
        title,
        description,
        item_type: "Task".to_string(),
        estimate: Some(estimate),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        priority: None,
    }
}

/// Features and epics get a design-first hierarchy with parallel
/// implementation and test tracks.
fn feature_strategy(input: &StrategyInput) -> Vec<SubtaskDescriptor> {
    vec![
        descriptor(
            "design",
            format!("Design: {}", input.title),
            format!("Produce a technical design for \"{}\".\n\n{}", input.title, input.specification),
            3.0,
            &[],
        ),
        descriptor(
            "implement-core",
            format!("Implement core of {}", input.title),
            "Build the core behavior described in the design.".to_string(),
            5.0,
            &["design"],
        ),
        descriptor(
            "implement-edges",
            format!("Handle edge cases for {}", input.title),
            "Cover the edge cases and failure paths the design calls out.".to_string(),
            3.0,
            &["implement-core"],
        ),
        descriptor(
            "tests",
            format!("Test {}", input.title),
            "Write automated tests for the new behavior.".to_string(),
            3.0,
            &["implement-core"],
        ),
        descriptor(
            "docs",
            format!("Document {}", input.title),
            "Update user-facing and internal documentation.".to_string(),
            1.0,
            &["implement-edges", "tests"],
        ),
    ]
}

fn story_strategy(input: &StrategyInput) -> Vec<SubtaskDescriptor> {
    vec![
        descriptor(
            "implement",
            format!("Implement: {}", input.title),
            format!("Implement the story.\n\n{}", input.specification),
            3.0,
            &[],
        ),
        descriptor(
            "tests",
            format!("Test {}", input.title),
            "Cover the story's acceptance criteria with tests.".to_string(),
            2.0,
            &["implement"],
        ),
        descriptor(
            "review",
            format!("Review and polish {}", input.title),
            "Address review feedback and verify against acceptance criteria.".to_string(),
            1.0,
            &["tests"],
        ),
    ]
}

/// Bugs get a strict investigate, fix, verify chain.
fn bug_strategy(input: &StrategyInput) -> Vec<SubtaskDescriptor> {
    vec![
        descriptor(
            "investigate",
            format!("Investigate: {}", input.title),
            format!("Reproduce and find the root cause.\n\n{}", input.specification),
            2.0,
            &[],
        ),
        descriptor(
            "fix",
            format!("Fix: {}", input.title),
            "Apply the fix for the identified root cause.".to_string(),
            3.0,
            &["investigate"],
        ),
        descriptor(
            "verify",
            format!("Verify fix for {}", input.title),
            "Confirm the original report no longer reproduces and add a regression test.".to_string(),
            2.0,
            &["fix"],
        ),
    ]
}

fn generic_strategy(input: &StrategyInput) -> Vec<SubtaskDescriptor> {
    vec![
        descriptor(
            "analyze",
            format!("Analyze: {}", input.title),
            format!("Break down the work.\n\n{}", input.specification),
            1.0,
            &[],
        ),
        descriptor(
            "implement",
            format!("Implement: {}", input.title),
            "Carry out the work identified during analysis.".to_string(),
            3.0,
            &["analyze"],
        ),
        descriptor(
            "verify",
            format!("Verify: {}", input.title),
            "Check the result against the description.".to_string(),
            1.0,
            &["implement"],
        ),
    ]
}

/// Extra descriptors implied by the user's approach hint. Matching is
/// substring-based on the lowered hint.
fn approach_tasks(approach: &str, parent_title: &str) -> Vec<SubtaskDescriptor> {
    let lowered = approach.to_lowercase();
    let mut extras = Vec::new();
    if lowered.contains("tdd") || lowered.contains("test-first") {
        extras.push(descriptor(
            "tdd-first",
            format!("Write tests first for {parent_title}"),
            "Write failing tests before any implementation work begins.".to_string(),
            2.0,
            &[],
        ));
    }
    if lowered.contains("spike") {
        extras.push(descriptor(
            "spike",
            format!("Spike: explore {parent_title}"),
            "Time-boxed investigation before committing to an approach.".to_string(),
            1.0,
            &[],
        ));
    }
    extras
}

/// Runs the plan stage against a session and its work item.
pub struct PlanStage {
    api: Arc<dyn BoardApi>,
    sessions: SessionManager,
}

impl PlanStage {
    pub fn new(api: Arc<dyn BoardApi>, sessions: SessionManager) -> Self {
        Self { api, sessions }
    }

    /// Build and store an execution plan for `item_id`.
    ///
    /// Descriptors whose titles match an existing child exactly are dropped
    /// so re-planning after a partial execution never duplicates records.
    pub async fn run(
        &self,
        session_id: &str,
        item_id: i64,
        approach: Option<&str>,
    ) -> Result<ExecutionPlan, StageError> {
        debug!(%session_id, item_id, ?approach, "run: called");
        let session = self.sessions.get_required(session_id).await?;

        let specification = session
            .working_str(working_keys::SPECIFICATION)
            .unwrap_or(MISSING_SPECIFICATION)
            .to_string();

        let item = self.api.get_item(item_id).await.map_err(StageError::Planning)?;
        let children = self.api.get_children(item_id).await.map_err(StageError::Planning)?;

        let plan = build_plan(&item, &specification, approach, &children);
        info!(
            item_id,
            subtask_count = plan.subtasks.len(),
            estimated_effort = plan.estimated_effort,
            "run: plan built"
        );

        let update = SessionUpdate::default()
            .with_stage(Stage::Planning)
            .with_value(working_keys::EXECUTION_PLAN, serde_json::to_value(&plan)?)
            .with_transcript(
                Role::Agent,
                format!("Planned {} subtask(s) for #{item_id}", plan.subtasks.len()),
            );
        self.sessions
            .update(&session.id, update)
            .await?
            .ok_or_else(|| StageError::SessionNotFound(session.id.clone()))?;

        Ok(plan)
    }
}

fn build_plan(
    item: &WorkItem,
    specification: &str,
    approach: Option<&str>,
    children: &[WorkItem],
) -> ExecutionPlan {
    let input = StrategyInput {
        title: item.title(),
        description: item.description(),
        specification,
    };

    let mut subtasks = strategy_for(item.item_type())(&input);
    if let Some(hint) = approach {
        subtasks.extend(approach_tasks(hint, item.title()));
    }

    let existing: Vec<&str> = children.iter().map(|c| c.title()).collect();
    let before = subtasks.len();
    subtasks.retain(|subtask| !existing.contains(&subtask.title.as_str()));
    let filtered = before - subtasks.len();

    let estimated_effort = subtasks.iter().filter_map(|s| s.estimate).sum();

    ExecutionPlan {
        parent_id: item.id,
        parent_title: item.title().to_string(),
        subtasks,
        estimated_effort,
        notes: (filtered > 0)
            .then(|| format!("{filtered} subtask(s) skipped: matching children already exist")),
    }
}
