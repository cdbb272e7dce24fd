use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::{info, warn};

use super::prompts::{PROTOCOL_SYSTEM_PROMPT, protocol_prompt};
use super::types::{load_state, step_failed, store_state};
use crate::collaborator::Collaborator;
use crate::error::AnalysisStep;
use crate::models::join_texts;

/// Extracts eligibility criteria, endpoints and safety monitoring from the protocol documents
pub struct ProtocolAnalysisTask {
    collaborator: Arc<dyn Collaborator>,
}

impl ProtocolAnalysisTask {
    pub fn new(collaborator: Arc<dyn Collaborator>) -> Self {
        Self { collaborator }
    }
}

#[async_trait]
impl Task for ProtocolAnalysisTask {
    fn id(&self) -> &str {
        AnalysisStep::Protocol.as_str()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut state = load_state(&context)?;
        info!(trial_id = %state.trial_id, task_id = %self.id(), "Starting protocol analysis");

        let protocol_count = state.protocol_documents().count();
        if protocol_count == 0 {
            // Not fatal: downstream steps work without protocol findings.
            warn!(trial_id = %state.trial_id, "No protocol document supplied, skipping protocol analysis");
            return Ok(TaskResult::new_with_status(
                None,
                NextAction::ContinueAndExecute,
                Some("No protocol document supplied; protocol analysis skipped".to_string()),
            ));
        }

        let prompt = protocol_prompt(&join_texts(state.protocol_documents()));
        let findings = self
            .collaborator
            .extract_protocol(PROTOCOL_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(step_failed(AnalysisStep::Protocol))?;

        info!(
            trial_id = %state.trial_id,
            protocol_documents = protocol_count,
            inclusion = findings.inclusion_criteria.len(),
            exclusion = findings.exclusion_criteria.len(),
            endpoints = findings.endpoints.len(),
            "Protocol analysis completed"
        );

        state.protocol_findings = Some(findings);
        store_state(&context, &state).await?;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some(format!("Analyzed {protocol_count} protocol document(s)")),
        ))
    }
}
