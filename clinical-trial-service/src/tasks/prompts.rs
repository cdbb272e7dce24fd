use graph_flow::Result;

use super::types::prompt_json;
use crate::models::{AnalysisState, ProtocolFindings};

pub const PROTOCOL_SYSTEM_PROMPT: &str = r#"You are an expert clinical trial protocol analyzer. Review the protocol and extract:
1. key_criteria: the key eligibility criteria that define the study population
2. inclusion_criteria: every condition a participant must meet to enroll
3. exclusion_criteria: every condition that disqualifies a participant
4. endpoints: the primary and secondary study endpoints
5. safety_monitoring: the safety monitoring requirements (labs, visits, stopping rules)
Quote the protocol wording where possible."#;

pub const SAFETY_SYSTEM_PROMPT: &str = r#"You are an expert clinical trial safety monitor. Review the documents and:
1. Identify potential safety concerns
2. Assess severity levels as low, medium or high
3. Provide specific recommendations for each concern
4. Link concerns to relevant protocol criteria when a protocol analysis is available"#;

pub const QUALITY_SYSTEM_PROMPT: &str = r#"You are an expert clinical data quality analyst. Review the documents and:
1. Identify potential data quality issues
2. Categorize issues by type
3. Assess impact levels
4. Suggest resolutions"#;

pub const RECOMMENDATIONS_SYSTEM_PROMPT: &str = r#"You are an expert clinical trial advisor. Based on the protocol analysis, safety alerts, and quality issues, provide strategic recommendations for trial optimization.
Write one recommendation per line."#;

pub const REPORT_SYSTEM_PROMPT: &str = r#"You are an expert clinical trial report writer. Create a comprehensive analysis report that includes protocol insights, safety concerns, data quality issues, and strategic recommendations."#;

const NO_PROTOCOL: &str = "none available (no protocol document was supplied)";

pub fn render_protocol(findings: Option<&ProtocolFindings>) -> Result<String> {
    match findings {
        Some(findings) => prompt_json(findings),
        None => Ok(NO_PROTOCOL.to_string()),
    }
}

pub fn protocol_prompt(protocol_text: &str) -> String {
    format!("Analyze this protocol:\n{protocol_text}")
}

pub fn safety_prompt(state: &AnalysisState) -> Result<String> {
    Ok(format!(
        "Review these documents:\n{}\n\nProtocol analysis:\n{}",
        state.combined_text(),
        render_protocol(state.protocol_findings.as_ref())?
    ))
}

pub fn quality_prompt(state: &AnalysisState) -> String {
    format!("Review these documents:\n{}", state.combined_text())
}

pub fn recommendations_prompt(state: &AnalysisState) -> Result<String> {
    Ok(format!(
        "Review this information:\nProtocol: {}\nSafety Alerts: {}\nQuality Issues: {}",
        render_protocol(state.protocol_findings.as_ref())?,
        prompt_json(&state.safety_alerts)?,
        prompt_json(&state.quality_issues)?
    ))
}

pub fn report_prompt(state: &AnalysisState) -> Result<String> {
    Ok(format!(
        "Generate report based on:\nProtocol: {}\nSafety: {}\nQuality: {}\nRecommendations: {}",
        render_protocol(state.protocol_findings.as_ref())?,
        prompt_json(&state.safety_alerts)?,
        prompt_json(&state.quality_issues)?,
        prompt_json(&state.recommendations)?
    ))
}
