//! Canned collaborator for exercising the workflow without a model.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::Collaborator;
use crate::error::CollaboratorError;
use crate::models::{ProtocolFindings, QualityIssue, SafetyAlert, Severity};
use crate::tasks::prompts::RECOMMENDATIONS_SYSTEM_PROMPT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Protocol,
    Safety,
    Quality,
    Recommendations,
    Report,
}

/// Shared record of the calls a [`ScriptedCollaborator`] received.
///
/// Survives the collaborator being moved into a wrapper.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<(Call, String)>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().iter().map(|(call, _)| *call).collect()
    }

    pub fn prompt_for(&self, call: Call) -> Option<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|(recorded, _)| *recorded == call)
            .map(|(_, prompt)| prompt.clone())
    }

    fn push(&self, call: Call, prompt: &str) {
        self.0.lock().unwrap().push((call, prompt.to_string()));
    }
}

/// Answers every call from fixed data and records what it was asked.
///
/// Protocol findings are read off the prompt: lines starting with
/// `Inclusion:` or `Exclusion:` become criteria.
pub struct ScriptedCollaborator {
    pub safety_alerts: Vec<SafetyAlert>,
    pub quality_issues: Vec<QualityIssue>,
    pub recommendations: String,
    pub report: String,
    failures: HashMap<Call, CollaboratorError>,
    stalls: HashSet<Call>,
    calls: CallLog,
}

impl Default for ScriptedCollaborator {
    fn default() -> Self {
        Self {
            safety_alerts: vec![SafetyAlert {
                id: "SA-1".to_string(),
                severity: Severity::High,
                description: "Grade 3 neutropenia in two participants".to_string(),
                recommendations: vec!["Increase CBC monitoring to weekly".to_string()],
                related_criteria: vec![],
            }],
            quality_issues: vec![QualityIssue {
                id: "DQ-1".to_string(),
                category: "missing data".to_string(),
                description: "Visit 3 vitals not recorded".to_string(),
                impact_level: "medium".to_string(),
                suggested_resolution: "Raise a site query".to_string(),
            }],
            recommendations: "Tighten lab monitoring\nRetrain site staff on CRF entry".to_string(),
            report: "Trial analysis report".to_string(),
            failures: HashMap::new(),
            stalls: HashSet::new(),
            calls: CallLog::default(),
        }
    }
}

impl ScriptedCollaborator {
    pub fn failing(mut self, call: Call, error: CollaboratorError) -> Self {
        self.failures.insert(call, error);
        self
    }

    /// Make `call` hang for an hour before answering.
    pub fn stalling(mut self, call: Call) -> Self {
        self.stalls.insert(call);
        self
    }

    pub fn call_log(&self) -> CallLog {
        self.calls.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.calls()
    }

    pub fn prompt_for(&self, call: Call) -> Option<String> {
        self.calls.prompt_for(call)
    }

    async fn record(&self, call: Call, prompt: &str) -> Result<(), CollaboratorError> {
        self.calls.push(call, prompt);
        if self.stalls.contains(&call) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        match self.failures.get(&call) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

fn criteria(prompt: &str, prefix: &str) -> Vec<String> {
    prompt
        .lines()
        .filter_map(|line| line.trim().strip_prefix(prefix))
        .map(|rest| rest.trim().to_string())
        .collect()
}

#[async_trait]
impl Collaborator for ScriptedCollaborator {
    async fn extract_protocol(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<ProtocolFindings, CollaboratorError> {
        self.record(Call::Protocol, prompt).await?;
        Ok(ProtocolFindings {
            key_criteria: vec![],
            inclusion_criteria: criteria(prompt, "Inclusion:"),
            exclusion_criteria: criteria(prompt, "Exclusion:"),
            endpoints: vec![],
            safety_monitoring: vec![],
        })
    }

    async fn extract_safety_alerts(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<Vec<SafetyAlert>, CollaboratorError> {
        self.record(Call::Safety, prompt).await?;
        Ok(self.safety_alerts.clone())
    }

    async fn extract_quality_issues(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<Vec<QualityIssue>, CollaboratorError> {
        self.record(Call::Quality, prompt).await?;
        Ok(self.quality_issues.clone())
    }

    async fn generate_text(&self, system: &str, prompt: &str) -> Result<String, CollaboratorError> {
        if system == RECOMMENDATIONS_SYSTEM_PROMPT {
            self.record(Call::Recommendations, prompt).await?;
            Ok(self.recommendations.clone())
        } else {
            self.record(Call::Report, prompt).await?;
            Ok(self.report.clone())
        }
    }
}
