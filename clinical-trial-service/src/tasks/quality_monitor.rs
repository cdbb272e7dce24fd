use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::prompts::{QUALITY_SYSTEM_PROMPT, quality_prompt};
use super::types::{load_state, state_keys, step_failed};
use crate::collaborator::Collaborator;
use crate::error::AnalysisStep;
use crate::models::BranchFindings;

/// Parallel branch: looks for data-quality issues across all documents
pub struct QualityMonitorTask {
    collaborator: Arc<dyn Collaborator>,
}

impl QualityMonitorTask {
    pub fn new(collaborator: Arc<dyn Collaborator>) -> Self {
        Self { collaborator }
    }
}

#[async_trait]
impl Task for QualityMonitorTask {
    fn id(&self) -> &str {
        AnalysisStep::Quality.as_str()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let state = load_state(&context)?;
        info!(trial_id = %state.trial_id, task_id = %self.id(), "Starting data quality monitoring");

        let issues = self
            .collaborator
            .extract_quality_issues(QUALITY_SYSTEM_PROMPT, &quality_prompt(&state))
            .await
            .map_err(step_failed(AnalysisStep::Quality))?;

        info!(trial_id = %state.trial_id, issues = issues.len(), "Data quality monitoring completed");

        let summary = format!("{} data quality issue(s)", issues.len());
        context
            .set(
                state_keys::QUALITY_BRANCH,
                BranchFindings {
                    quality_issues: issues,
                    ..BranchFindings::default()
                },
            )
            .await?;

        Ok(TaskResult::new_with_status(
            Some(summary.clone()),
            NextAction::End,
            Some(summary),
        ))
    }
}
