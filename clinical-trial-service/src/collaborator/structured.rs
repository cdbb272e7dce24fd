use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CollaboratorError;
use crate::models::{ProtocolFindings, QualityIssue, SafetyAlert};

pub const PROTOCOL_SHAPE: &str = "ProtocolFindings";
pub const SAFETY_SHAPE: &str = "SafetyAlert list";
pub const QUALITY_SHAPE: &str = "QualityIssue list";

pub const PROTOCOL_FORMAT: &str = r#"Respond **only** with JSON of the form
{"key_criteria": ["..."], "inclusion_criteria": ["..."], "exclusion_criteria": ["..."], "endpoints": ["..."], "safety_monitoring": ["..."]}
Every field is required; use an empty list when the document says nothing about it."#;

pub const SAFETY_FORMAT: &str = r#"Respond **only** with JSON of the form
{"alerts": [{"id": "SA-1", "severity": "low|medium|high", "description": "...", "recommendations": ["..."], "related_criteria": ["..."]}]}
Use an empty "alerts" list when there are no concerns."#;

pub const QUALITY_FORMAT: &str = r#"Respond **only** with JSON of the form
{"issues": [{"id": "DQ-1", "category": "...", "description": "...", "impact_level": "...", "suggested_resolution": "..."}]}
Use an empty "issues" list when there are no issues."#;

/// Drop a surrounding Markdown code fence, if the model added one.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_protocol(raw: &str) -> Result<ProtocolFindings, CollaboratorError> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| CollaboratorError::schema(PROTOCOL_SHAPE, e))
}

pub fn parse_safety_alerts(raw: &str) -> Result<Vec<SafetyAlert>, CollaboratorError> {
    parse_list(raw, "alerts", SAFETY_SHAPE)
}

pub fn parse_quality_issues(raw: &str) -> Result<Vec<QualityIssue>, CollaboratorError> {
    parse_list(raw, "issues", QUALITY_SHAPE)
}

/// Lists arrive either bare or wrapped in an object under `wrapper`.
fn parse_list<T: DeserializeOwned>(
    raw: &str,
    wrapper: &str,
    shape: &'static str,
) -> Result<Vec<T>, CollaboratorError> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| CollaboratorError::schema(shape, e))?;

    let items = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut fields) => fields.remove(wrapper).ok_or_else(|| {
            CollaboratorError::schema(shape, format!("expected a list or an object with '{wrapper}'"))
        })?,
        other => {
            return Err(CollaboratorError::schema(
                shape,
                format!("expected a list, got {other}"),
            ));
        }
    };

    serde_json::from_value(items).map_err(|e| CollaboratorError::schema(shape, e))
}
