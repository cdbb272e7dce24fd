//! Entry point for one trial analysis run.

use graph_flow::{Graph, GraphError, Session};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::collaborator::{Collaborator, OpenRouterCollaborator, ResilientCollaborator};
use crate::config::{AnalysisConfig, DEFAULT_MAX_DOCUMENTS};
use crate::error::TrialAnalysisError;
use crate::models::{AnalysisState, ClinicalDocument};
use crate::tasks::types::{load_state, store_state};
use crate::workflow::{WORKFLOW_ID, build_trial_workflow};

/// Runs the fixed analysis workflow, one fresh [`AnalysisState`] per call.
///
/// The graph is built once and shared; each run gets its own session, so
/// concurrent runs do not see each other's state.
#[derive(Clone)]
pub struct TrialAnalyzer {
    graph: Arc<Graph>,
    max_documents: usize,
}

impl TrialAnalyzer {
    pub fn new(collaborator: Arc<dyn Collaborator>) -> Result<Self, TrialAnalysisError> {
        let graph = build_trial_workflow(collaborator)?;
        Ok(Self {
            graph: Arc::new(graph),
            max_documents: DEFAULT_MAX_DOCUMENTS,
        })
    }

    /// OpenRouter-backed analyzer with the configured timeout, retries and limits.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, TrialAnalysisError> {
        let collaborator = ResilientCollaborator::new(
            OpenRouterCollaborator::from_config(config),
            config.call_policy.clone(),
        );
        Ok(Self::new(Arc::new(collaborator))?.with_max_documents(config.max_documents))
    }

    pub fn with_max_documents(mut self, max_documents: usize) -> Self {
        self.max_documents = max_documents;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Analyze the documents of one trial.
    ///
    /// Either every step succeeds and the populated state is returned, or the
    /// first failing step aborts the run and its error is returned.
    pub async fn run(
        &self,
        trial_id: &str,
        documents: Vec<ClinicalDocument>,
    ) -> Result<AnalysisState, TrialAnalysisError> {
        self.validate(trial_id, &documents)?;

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("trial_analysis", trial_id = %trial_id, run_id = %run_id);

        self.execute(&run_id, trial_id, documents)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        run_id: &str,
        trial_id: &str,
        documents: Vec<ClinicalDocument>,
    ) -> Result<AnalysisState, TrialAnalysisError> {
        info!(documents = documents.len(), "Starting trial analysis");

        let start_task_id = self
            .graph
            .start_task_id()
            .ok_or_else(|| GraphError::TaskNotFound("start task".to_string()))?;
        let mut session = Session::new_from_task(run_id.to_string(), &start_task_id)
            .with_graph_id(WORKFLOW_ID);
        store_state(&session.context, &AnalysisState::new(trial_id, documents)).await?;

        if let Err(e) = self.graph.run_to_completion(&mut session).await {
            let err = TrialAnalysisError::from(e);
            error!(step = ?err.step(), error = %err, "Trial analysis failed");
            return Err(err);
        }

        let state = load_state(&session.context)?;
        info!(
            safety_alerts = state.safety_alerts.len(),
            quality_issues = state.quality_issues.len(),
            recommendations = state.recommendations.len(),
            "Trial analysis completed"
        );
        Ok(state)
    }

    fn validate(
        &self,
        trial_id: &str,
        documents: &[ClinicalDocument],
    ) -> Result<(), TrialAnalysisError> {
        if trial_id.trim().is_empty() {
            return Err(TrialAnalysisError::InvalidInput(
                "trial_id must not be empty".to_string(),
            ));
        }
        if documents.len() > self.max_documents {
            return Err(TrialAnalysisError::InvalidInput(format!(
                "{} documents supplied, at most {} are accepted",
                documents.len(),
                self.max_documents
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::scripted::{Call, ScriptedCollaborator};
    use crate::config::CallPolicy;
    use crate::error::{AnalysisStep, CollaboratorError, StepFailure};
    use crate::models::DocumentType;
    use std::time::Duration;

    fn analyzer(collaborator: Arc<ScriptedCollaborator>) -> TrialAnalyzer {
        TrialAnalyzer::new(collaborator).unwrap()
    }

    fn protocol(text: &str) -> ClinicalDocument {
        ClinicalDocument::new("PROTO-001", DocumentType::Protocol, text)
    }

    fn safety_report(text: &str) -> ClinicalDocument {
        ClinicalDocument::new("SAFETY-001", DocumentType::SafetyReport, text)
    }

    #[tokio::test]
    async fn protocol_criteria_flow_into_the_final_state() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let analysis = analyzer(collaborator.clone())
            .run("T-1", vec![protocol("Inclusion: age 18-65")])
            .await
            .unwrap();

        let findings = analysis.protocol_findings.unwrap();
        assert_eq!(findings.inclusion_criteria, vec!["age 18-65"]);
        assert_eq!(
            analysis.recommendations,
            vec!["Tighten lab monitoring", "Retrain site staff on CRF entry"]
        );
        assert_eq!(analysis.final_report, "Trial analysis report");
        assert_eq!(analysis.trial_id, "T-1");
        assert_eq!(analysis.documents.len(), 1);
    }

    #[tokio::test]
    async fn missing_protocol_is_not_fatal() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let analysis = analyzer(collaborator.clone())
            .run("T-2", vec![safety_report("ALT elevated in subject 004")])
            .await
            .unwrap();

        assert!(analysis.protocol_findings.is_none());
        assert!(!analysis.final_report.is_empty());
        assert!(!collaborator.calls().contains(&Call::Protocol));

        let safety_prompt = collaborator.prompt_for(Call::Safety).unwrap();
        assert!(safety_prompt.contains("ALT elevated in subject 004"));
        assert!(safety_prompt.contains("none available"));
    }

    #[tokio::test]
    async fn branch_findings_are_merged_exactly_once() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let analysis = analyzer(collaborator.clone())
            .run("T-3", vec![protocol("Exclusion: pregnancy"), safety_report("no events")])
            .await
            .unwrap();

        assert_eq!(analysis.safety_alerts, collaborator.safety_alerts);
        assert_eq!(analysis.quality_issues, collaborator.quality_issues);

        let calls = collaborator.calls();
        assert_eq!(calls.first(), Some(&Call::Protocol));
        assert_eq!(&calls[3..], &[Call::Recommendations, Call::Report]);
    }

    #[tokio::test]
    async fn runs_are_deterministic_for_a_deterministic_collaborator() {
        let analyzer = analyzer(Arc::new(ScriptedCollaborator::default()));
        let documents = vec![protocol("Inclusion: BMI < 30"), safety_report("two AEs")];

        let first = analyzer.run("T-4", documents.clone()).await.unwrap();
        let second = analyzer.run("T-4", documents).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn a_failing_branch_stops_the_run_before_recommendations() {
        let collaborator = Arc::new(
            ScriptedCollaborator::default().failing(
                Call::Quality,
                CollaboratorError::schema("QualityIssue", "missing field `category`"),
            ),
        );
        let err = analyzer(collaborator.clone())
            .run("T-5", vec![protocol("Inclusion: adults")])
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(AnalysisStep::Quality));
        assert!(matches!(
            err,
            TrialAnalysisError::Step(StepFailure {
                source: CollaboratorError::Schema { .. },
                ..
            })
        ));
        let calls = collaborator.calls();
        assert!(!calls.contains(&Call::Recommendations));
        assert!(!calls.contains(&Call::Report));
    }

    #[tokio::test]
    async fn unavailable_protocol_step_is_reported_with_its_step() {
        let collaborator = Arc::new(ScriptedCollaborator::default().failing(
            Call::Protocol,
            CollaboratorError::unavailable("401 Unauthorized"),
        ));
        let err = analyzer(collaborator.clone())
            .run("T-6", vec![protocol("Inclusion: adults")])
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(AnalysisStep::Protocol));
        assert_eq!(collaborator.calls(), vec![Call::Protocol]);
    }

    #[tokio::test]
    async fn empty_document_list_still_produces_a_report() {
        let analysis = analyzer(Arc::new(ScriptedCollaborator::default()))
            .run("T-7", vec![])
            .await
            .unwrap();

        assert!(analysis.protocol_findings.is_none());
        assert_eq!(analysis.final_report, "Trial analysis report");
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_call() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let analyzer = analyzer(collaborator.clone()).with_max_documents(1);

        let err = analyzer.run("  ", vec![]).await.unwrap_err();
        assert!(matches!(err, TrialAnalysisError::InvalidInput(_)));

        let err = analyzer
            .run("T-8", vec![protocol("a"), safety_report("b")])
            .await
            .unwrap_err();
        assert!(matches!(err, TrialAnalysisError::InvalidInput(_)));
        assert!(collaborator.calls().is_empty());
    }

    #[tokio::test]
    async fn recommendation_items_keep_empty_lines() {
        let mut collaborator = ScriptedCollaborator::default();
        collaborator.recommendations = "1. A\n\n2. B\n".to_string();

        let analysis = analyzer(Arc::new(collaborator))
            .run("T-9", vec![protocol("Inclusion: adults")])
            .await
            .unwrap();

        assert_eq!(analysis.recommendations, vec!["1. A", "", "2. B", ""]);
    }

    #[tokio::test(start_paused = true)]
    async fn a_stalled_call_times_out_and_aborts_the_run() {
        let collaborator = ScriptedCollaborator::default().stalling(Call::Safety);
        let log = collaborator.call_log();
        let resilient = ResilientCollaborator::new(
            collaborator,
            CallPolicy {
                timeout: Duration::from_secs(30),
                ..CallPolicy::default()
            },
        );

        let err = TrialAnalyzer::new(Arc::new(resilient))
            .unwrap()
            .run("T-10", vec![protocol("Inclusion: adults")])
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(AnalysisStep::Safety));
        assert!(matches!(
            err,
            TrialAnalysisError::Step(StepFailure {
                source: CollaboratorError::Timeout { after },
                ..
            }) if after == Duration::from_secs(30)
        ));
        let calls = log.calls();
        assert!(!calls.contains(&Call::Recommendations));
        assert!(!calls.contains(&Call::Report));
    }
}
