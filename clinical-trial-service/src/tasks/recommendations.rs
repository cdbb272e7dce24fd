use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::prompts::{RECOMMENDATIONS_SYSTEM_PROMPT, recommendations_prompt};
use super::types::{load_state, step_failed, store_state};
use crate::collaborator::Collaborator;
use crate::error::AnalysisStep;

/// Turns protocol findings, safety alerts and quality issues into strategic recommendations
pub struct RecommendationsTask {
    collaborator: Arc<dyn Collaborator>,
}

impl RecommendationsTask {
    pub fn new(collaborator: Arc<dyn Collaborator>) -> Self {
        Self { collaborator }
    }
}

/// One recommendation per `\n`-separated line, kept verbatim.
///
/// Empty lines stay as empty items; skipping them is up to whoever displays
/// the list.
pub fn split_recommendations(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

#[async_trait]
impl Task for RecommendationsTask {
    fn id(&self) -> &str {
        AnalysisStep::Recommendations.as_str()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut state = load_state(&context)?;
        info!(
            trial_id = %state.trial_id,
            task_id = %self.id(),
            safety_alerts = state.safety_alerts.len(),
            quality_issues = state.quality_issues.len(),
            "Generating recommendations"
        );

        let response = self
            .collaborator
            .generate_text(RECOMMENDATIONS_SYSTEM_PROMPT, &recommendations_prompt(&state)?)
            .await
            .map_err(step_failed(AnalysisStep::Recommendations))?;

        state.recommendations = split_recommendations(&response);
        info!(trial_id = %state.trial_id, recommendations = state.recommendations.len(), "Recommendations generated");

        let status = format!("{} recommendation(s) generated", state.recommendations.len());
        store_state(&context, &state).await?;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some(status),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_line_becomes_an_item_including_empty_ones() {
        assert_eq!(
            split_recommendations("1. A\n\n2. B\n"),
            vec!["1. A", "", "2. B", ""]
        );
    }

    #[test]
    fn line_text_is_kept_verbatim() {
        let text = "1. Tighten liver monitoring\n   \n2. Re-train sites on AE coding  \r";
        assert_eq!(
            split_recommendations(text),
            vec![
                "1. Tighten liver monitoring",
                "   ",
                "2. Re-train sites on AE coding  \r",
            ]
        );
    }

    #[test]
    fn empty_response_is_a_single_empty_item() {
        assert_eq!(split_recommendations(""), vec![""]);
    }
}
