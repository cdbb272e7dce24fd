use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of clinical document, chosen by whoever uploaded it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Protocol,
    SafetyReport,
    CaseReport,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalDocument {
    #[serde(alias = "doc_id")]
    pub id: String,
    #[serde(rename = "type", alias = "doc_type")]
    pub doc_type: DocumentType,
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ClinicalDocument {
    pub fn new(id: impl Into<String>, doc_type: DocumentType, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            doc_type,
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolFindings {
    pub key_criteria: Vec<String>,
    pub inclusion_criteria: Vec<String>,
    pub exclusion_criteria: Vec<String>,
    #[serde(alias = "study_endpoints")]
    pub endpoints: Vec<String>,
    pub safety_monitoring: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "moderate" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

// Model output is not consistent about casing, so accept any.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyAlert {
    #[serde(alias = "alert_id")]
    pub id: String,
    pub severity: Severity,
    pub description: String,
    pub recommendations: Vec<String>,
    pub related_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    #[serde(alias = "issue_id")]
    pub id: String,
    pub category: String,
    pub description: String,
    pub impact_level: String,
    pub suggested_resolution: String,
}

/// What one parallel branch contributes to the append-only fields of [`AnalysisState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchFindings {
    pub safety_alerts: Vec<SafetyAlert>,
    pub quality_issues: Vec<QualityIssue>,
}

/// Accumulator threaded through every step of one trial analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisState {
    pub trial_id: String,
    pub documents: Vec<ClinicalDocument>,
    pub protocol_findings: Option<ProtocolFindings>,
    pub safety_alerts: Vec<SafetyAlert>,
    pub quality_issues: Vec<QualityIssue>,
    pub recommendations: Vec<String>,
    pub final_report: String,
}

impl AnalysisState {
    pub fn new(trial_id: impl Into<String>, documents: Vec<ClinicalDocument>) -> Self {
        Self {
            trial_id: trial_id.into(),
            documents,
            protocol_findings: None,
            safety_alerts: Vec::new(),
            quality_issues: Vec::new(),
            recommendations: Vec::new(),
            final_report: String::new(),
        }
    }

    /// Concatenate a branch's findings onto the append-only fields.
    pub fn absorb(&mut self, findings: BranchFindings) {
        self.safety_alerts.extend(findings.safety_alerts);
        self.quality_issues.extend(findings.quality_issues);
    }

    pub fn protocol_documents(&self) -> impl Iterator<Item = &ClinicalDocument> {
        self.documents
            .iter()
            .filter(|doc| doc.doc_type == DocumentType::Protocol)
    }

    /// Text of every document in input order, separated by blank lines.
    pub fn combined_text(&self) -> String {
        join_texts(self.documents.iter())
    }
}

pub(crate) fn join_texts<'a>(documents: impl Iterator<Item = &'a ClinicalDocument>) -> String {
    documents
        .map(|doc| doc.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeTrialRequest {
    pub trial_id: String,
    pub documents: Vec<ClinicalDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alert(id: &str) -> SafetyAlert {
        SafetyAlert {
            id: id.to_string(),
            severity: Severity::Low,
            description: String::new(),
            recommendations: vec![],
            related_criteria: vec![],
        }
    }

    #[test]
    fn documents_accept_legacy_field_names() {
        let doc: ClinicalDocument = serde_json::from_value(json!({
            "doc_id": "PROTO-001",
            "doc_type": "protocol",
            "content": "Inclusion: age 18-65",
            "metadata": {"version": "1.0"}
        }))
        .unwrap();

        assert_eq!(doc.id, "PROTO-001");
        assert_eq!(doc.doc_type, DocumentType::Protocol);
        assert_eq!(doc.metadata.get("version").map(String::as_str), Some("1.0"));

        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded["type"], "protocol");
        assert_eq!(encoded["text"], "Inclusion: age 18-65");
    }

    #[test]
    fn severity_parses_any_casing_and_rejects_unknown_levels() {
        let parsed: Vec<Severity> = serde_json::from_value(json!(["HIGH", "Medium", "low"])).unwrap();
        assert_eq!(parsed, vec![Severity::High, Severity::Medium, Severity::Low]);
        assert!(serde_json::from_value::<Severity>(json!("critical")).is_err());
        assert_eq!(serde_json::to_value(Severity::High).unwrap(), json!("high"));
    }

    #[test]
    fn absorb_concatenates_and_keeps_branch_order() {
        let mut state = AnalysisState::new("T-1", vec![]);
        state.absorb(BranchFindings {
            safety_alerts: vec![alert("a1"), alert("a2")],
            quality_issues: vec![],
        });
        state.absorb(BranchFindings {
            safety_alerts: vec![alert("b1")],
            quality_issues: vec![],
        });

        let ids: Vec<&str> = state.safety_alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn combined_text_keeps_input_order() {
        let state = AnalysisState::new(
            "T-1",
            vec![
                ClinicalDocument::new("1", DocumentType::SafetyReport, "first"),
                ClinicalDocument::new("2", DocumentType::Protocol, "second"),
                ClinicalDocument::new("3", DocumentType::Protocol, "third"),
            ],
        );

        assert_eq!(state.combined_text(), "first\n\nsecond\n\nthird");
        assert_eq!(join_texts(state.protocol_documents()), "second\n\nthird");
    }
}
