//! Execute stage: create the planned subtasks against the backend
//!
//! The stored plan is consumed in chunks. Creations within a chunk run
//! concurrently; chunks run sequentially with a fixed pause between them to
//! stay under the backend's rate limits. A failed creation never aborts the
//! run; it becomes a `FailedTask` entry and the plan stays in the session
//! for a retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use boardclient::{BoardApi, fields};

use crate::config::ExecutionConfig;
use crate::session::{Role, SessionManager, SessionUpdate, Stage, working_keys};
use crate::stages::{
    CreatedTask, ExecutionPlan, ExecutionResult, FailedTask, StageError, SubtaskDescriptor,
};

/// Caller knobs for one execute run.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Report what would be created without touching the backend.
    pub dry_run: bool,
    /// Override the configured chunk size. Clamped to the configured
    /// ceiling.
    pub batch_size: Option<usize>,
}

/// Runs the execute stage against a session's stored plan.
pub struct ExecuteStage {
    api: Arc<dyn BoardApi>,
    sessions: SessionManager,
    config: ExecutionConfig,
}

impl ExecuteStage {
    pub fn new(api: Arc<dyn BoardApi>, sessions: SessionManager, config: ExecutionConfig) -> Self {
        Self {
            api,
            sessions,
            config,
        }
    }

    /// Execute the session's stored plan.
    ///
    /// Dry runs are pure: no backend calls, no session mutation. Real runs
    /// always record the result in working data; on full success the plan is
    /// cleared and the session returns to `Idle`, otherwise it stays in
    /// `Executing` with the plan intact.
    pub async fn run(
        &self,
        session_id: &str,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, StageError> {
        debug!(%session_id, dry_run = options.dry_run, "run: called");
        let session = self.sessions.get_required(session_id).await?;

        let plan: ExecutionPlan = session
            .working_data
            .get(working_keys::EXECUTION_PLAN)
            .cloned()
            .ok_or(StageError::PlanNotFound)
            .and_then(|value| serde_json::from_value(value).map_err(StageError::Serialize))?;

        let batch_size = options
            .batch_size
            .unwrap_or(self.config.batch_size)
            .clamp(1, self.config.max_batch_size);

        if options.dry_run {
            info!(subtask_count = plan.subtasks.len(), "run: dry run, nothing created");
            return Ok(dry_run_result(&plan));
        }

        self.sessions
            .update(
                &session.id,
                SessionUpdate::default().with_stage(Stage::Executing),
            )
            .await?
            .ok_or_else(|| StageError::SessionNotFound(session.id.clone()))?;

        let total = plan.subtasks.len();
        let mut created = Vec::new();
        let mut failed = Vec::new();

        for (chunk_index, chunk) in plan.subtasks.chunks(batch_size).enumerate() {
            if chunk_index > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
            debug!(chunk_index, chunk_len = chunk.len(), "run: creating chunk");

            let offset = chunk_index * batch_size;
            let outcomes = join_all(chunk.iter().enumerate().map(|(i, subtask)| {
                self.create_subtask(offset + i, subtask, plan.parent_id)
            }))
            .await;

            for outcome in outcomes {
                match outcome {
                    Ok(task) => created.push(task),
                    Err(task) => failed.push(task),
                }
            }
        }

        let success = failed.is_empty();
        let result = ExecutionResult {
            success,
            dry_run: false,
            total,
            created,
            failed,
        };

        let mut update = SessionUpdate::default()
            .with_value(
                working_keys::LAST_EXECUTION_RESULT,
                serde_json::to_value(&result)?,
            )
            .with_transcript(
                Role::Agent,
                format!(
                    "Created {}/{} subtask(s) under #{}",
                    result.created.len(),
                    total,
                    plan.parent_id
                ),
            );
        if success {
            update = update
                .with_stage(Stage::Idle)
                .with_removal(working_keys::EXECUTION_PLAN);
        }
        self.sessions
            .update(&session.id, update)
            .await?
            .ok_or_else(|| StageError::SessionNotFound(session.id.clone()))?;

        info!(
            created = result.created.len(),
            failed = result.failed.len(),
            success,
            "run: execution finished"
        );
        Ok(result)
    }

    /// Create one subtask and link it under the parent. A failed link is a
    /// soft failure: the record exists, so the task still counts as created
    /// with the link error attached.
    async fn create_subtask(
        &self,
        index: usize,
        subtask: &SubtaskDescriptor,
        parent_id: i64,
    ) -> Result<CreatedTask, FailedTask> {
        let mut item_fields: HashMap<String, Value> = HashMap::new();
        item_fields.insert(fields::TITLE.to_string(), json!(subtask.title));
        item_fields.insert(fields::DESCRIPTION.to_string(), json!(subtask.description));
        if let Some(estimate) = subtask.estimate {
            item_fields.insert(fields::EFFORT.to_string(), json!(estimate));
        }
        if let Some(priority) = subtask.priority {
            item_fields.insert(fields::PRIORITY.to_string(), json!(priority));
        }

        let item = self
            .api
            .create_item(&subtask.item_type, &item_fields)
            .await
            .map_err(|error| {
                warn!(index, title = %subtask.title, %error, "create_subtask: creation failed");
                FailedTask {
                    index,
                    title: subtask.title.clone(),
                    error: error.to_string(),
                }
            })?;

        let link_error = match self.api.add_child_link(parent_id, item.id).await {
            Ok(()) => None,
            Err(error) => {
                warn!(index, child_id = item.id, %error, "create_subtask: parent link failed");
                Some(error.to_string())
            }
        };

        Ok(CreatedTask {
            index,
            title: subtask.title.clone(),
            id: item.id,
            reference: item
                .url
                .clone()
                .unwrap_or_else(|| format!("item:{}", item.id)),
            link_error,
        })
    }
}

/// Dry-run placeholders use negative ids so they can never collide with a
/// real backend id.
fn dry_run_result(plan: &ExecutionPlan) -> ExecutionResult {
    let created = plan
        .subtasks
        .iter()
        .enumerate()
        .map(|(index, subtask)| CreatedTask {
            index,
            title: subtask.title.clone(),
            id: -(index as i64) - 1,
            reference: format!("dry-run://{}/{}", plan.parent_id, subtask.key),
            link_error: None,
        })
        .collect::<Vec<_>>();
    ExecutionResult {
        success: true,
        dry_run: true,
        total: plan.subtasks.len(),
        created,
        failed: Vec::new(),
    }
}
