use crate::collaborator::Collaborator;
use crate::models::{AnalysisState, BranchFindings};
use crate::tasks::*;
use graph_flow::{Context, FanOutTask, Graph, GraphBuilder, Task};
use std::sync::Arc;
use tracing::debug;

pub const WORKFLOW_ID: &str = "clinical_trial_analysis";
pub const PARALLEL_MONITORING_ID: &str = "parallel_monitoring";

/// Builds protocol → {safety, quality} → recommendations → report.
pub fn build_trial_workflow(collaborator: Arc<dyn Collaborator>) -> graph_flow::Result<Graph> {
    let protocol_task = Arc::new(ProtocolAnalysisTask::new(collaborator.clone()));
    let protocol_id = protocol_task.id().to_string();

    let branches: Vec<Arc<dyn Task>> = vec![
        Arc::new(SafetyMonitorTask::new(collaborator.clone())),
        Arc::new(QualityMonitorTask::new(collaborator.clone())),
    ];
    let monitoring_task =
        Arc::new(FanOutTask::new(PARALLEL_MONITORING_ID, branches).with_join(merge_branch_findings));

    let recommendations_task = Arc::new(RecommendationsTask::new(collaborator.clone()));
    let recommendations_id = recommendations_task.id().to_string();

    let report_task = Arc::new(FinalReportTask::new(collaborator));
    let report_id = report_task.id().to_string();

    GraphBuilder::new(WORKFLOW_ID)
        .add_task(protocol_task)
        .add_task(monitoring_task)
        .add_task(recommendations_task)
        .add_task(report_task)
        .add_edge(&protocol_id, PARALLEL_MONITORING_ID)
        .add_edge(PARALLEL_MONITORING_ID, &recommendations_id)
        .add_edge(&recommendations_id, &report_id)
        .build()
}

/// Join point of the parallel branches: concatenate each branch's findings
/// onto the analysis state, safety first, then quality.
fn merge_branch_findings(context: &Context) -> graph_flow::Result<()> {
    let mut state: AnalysisState = context.require(state_keys::ANALYSIS_STATE)?;

    for key in [state_keys::SAFETY_BRANCH, state_keys::QUALITY_BRANCH] {
        let findings: BranchFindings = context.require(key)?;
        context.remove_sync(key);
        debug!(
            branch = key,
            safety_alerts = findings.safety_alerts.len(),
            quality_issues = findings.quality_issues.len(),
            "merging branch findings"
        );
        state.absorb(findings);
    }

    context.set_sync(state_keys::ANALYSIS_STATE, &state)
}
