use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::{info, warn};

use super::prompts::{REPORT_SYSTEM_PROMPT, report_prompt};
use super::types::{load_state, step_failed, store_state};
use crate::collaborator::Collaborator;
use crate::error::AnalysisStep;

/// Terminal step: writes the comprehensive trial report
pub struct FinalReportTask {
    collaborator: Arc<dyn Collaborator>,
}

impl FinalReportTask {
    pub fn new(collaborator: Arc<dyn Collaborator>) -> Self {
        Self { collaborator }
    }
}

#[async_trait]
impl Task for FinalReportTask {
    fn id(&self) -> &str {
        AnalysisStep::Report.as_str()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut state = load_state(&context)?;
        info!(trial_id = %state.trial_id, task_id = %self.id(), "Generating final report");

        let report = self
            .collaborator
            .generate_text(REPORT_SYSTEM_PROMPT, &report_prompt(&state)?)
            .await
            .map_err(step_failed(AnalysisStep::Report))?;

        if report.trim().is_empty() {
            warn!(trial_id = %state.trial_id, "Report generator returned an empty report");
        }
        info!(trial_id = %state.trial_id, report_chars = report.len(), "Final report generated");

        state.final_report = report;
        store_state(&context, &state).await?;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::End,
            Some("Trial analysis completed".to_string()),
        ))
    }
}
