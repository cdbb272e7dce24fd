use graph_flow::{Context, Result};
use serde::Serialize;

use crate::error::{AnalysisStep, CollaboratorError, StepFailure};
use crate::models::AnalysisState;

/// Context keys shared by the analysis tasks
pub mod state_keys {
    pub const ANALYSIS_STATE: &str = "analysis_state";
    pub const SAFETY_BRANCH: &str = "branch.safety";
    pub const QUALITY_BRANCH: &str = "branch.quality";
}

pub fn load_state(context: &Context) -> Result<AnalysisState> {
    context.require(state_keys::ANALYSIS_STATE)
}

pub async fn store_state(context: &Context, state: &AnalysisState) -> Result<()> {
    context.set(state_keys::ANALYSIS_STATE, state).await
}

pub fn step_failed(step: AnalysisStep) -> impl FnOnce(CollaboratorError) -> StepFailure {
    move |source| StepFailure { step, source }
}

/// Pretty JSON for embedding a finding in a prompt.
pub fn prompt_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| graph_flow::GraphError::ContextError(format!("failed to render prompt: {e}")))
}
