use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::prompts::{SAFETY_SYSTEM_PROMPT, safety_prompt};
use super::types::{load_state, state_keys, step_failed};
use crate::collaborator::Collaborator;
use crate::error::AnalysisStep;
use crate::models::{BranchFindings, Severity};

/// Parallel branch: raises safety alerts across all documents.
///
/// Writes its alerts to [`state_keys::SAFETY_BRANCH`]; they are merged into
/// the analysis state once the quality branch has finished too.
pub struct SafetyMonitorTask {
    collaborator: Arc<dyn Collaborator>,
}

impl SafetyMonitorTask {
    pub fn new(collaborator: Arc<dyn Collaborator>) -> Self {
        Self { collaborator }
    }
}

#[async_trait]
impl Task for SafetyMonitorTask {
    fn id(&self) -> &str {
        AnalysisStep::Safety.as_str()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let state = load_state(&context)?;
        info!(trial_id = %state.trial_id, task_id = %self.id(), "Starting safety monitoring");

        let alerts = self
            .collaborator
            .extract_safety_alerts(SAFETY_SYSTEM_PROMPT, &safety_prompt(&state)?)
            .await
            .map_err(step_failed(AnalysisStep::Safety))?;

        let high = alerts
            .iter()
            .filter(|alert| alert.severity == Severity::High)
            .count();
        info!(
            trial_id = %state.trial_id,
            alerts = alerts.len(),
            high_severity = high,
            "Safety monitoring completed"
        );

        let summary = format!("{} safety alert(s), {} high severity", alerts.len(), high);
        context
            .set(
                state_keys::SAFETY_BRANCH,
                BranchFindings {
                    safety_alerts: alerts,
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
