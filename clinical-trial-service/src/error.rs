use graph_flow::GraphError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failures of the external text-generation collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The response could not be validated against the requested record shape
    #[error("response did not match the {shape} schema: {reason}")]
    Schema { shape: &'static str, reason: String },

    /// Network, authentication or rate-limit failure
    #[error("text generation service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("text generation call timed out after {after:?}")]
    Timeout { after: Duration },
}

impl CollaboratorError {
    pub fn schema(shape: &'static str, reason: impl fmt::Display) -> Self {
        Self::Schema {
            shape,
            reason: reason.to_string(),
        }
    }

    pub fn unavailable(reason: impl fmt::Display) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    /// Whether trying the same call again could succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Schema { .. })
    }
}

/// The five analysis steps, named as they appear in logs and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStep {
    Protocol,
    Safety,
    Quality,
    Recommendations,
    Report,
}

impl AnalysisStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protocol => "analyze_protocol",
            Self::Safety => "monitor_safety",
            Self::Quality => "monitor_quality",
            Self::Recommendations => "generate_recommendations",
            Self::Report => "generate_report",
        }
    }
}

impl fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("step {step} failed: {source}")]
pub struct StepFailure {
    pub step: AnalysisStep,
    #[source]
    pub source: CollaboratorError,
}

impl From<StepFailure> for GraphError {
    fn from(failure: StepFailure) -> Self {
        GraphError::Other(anyhow::Error::new(failure))
    }
}

/// Why a trial analysis run did not produce an [`crate::AnalysisState`]
#[derive(Error, Debug)]
pub enum TrialAnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Step(#[from] StepFailure),

    #[error("workflow error: {0}")]
    Workflow(GraphError),
}

impl TrialAnalysisError {
    /// The step that failed, when the failure came from a collaborator call
    pub fn step(&self) -> Option<AnalysisStep> {
        match self {
            Self::Step(failure) => Some(failure.step),
            _ => None,
        }
    }
}

impl From<GraphError> for TrialAnalysisError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Other(inner) => match inner.downcast::<StepFailure>() {
                Ok(failure) => Self::Step(failure),
                Err(other) => Self::Workflow(GraphError::Other(other)),
            },
            other => Self::Workflow(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failures_survive_the_graph_error_round_trip() {
        let failure = StepFailure {
            step: AnalysisStep::Quality,
            source: CollaboratorError::schema("QualityIssue list", "missing field `category`"),
        };

        let err = TrialAnalysisError::from(GraphError::from(failure.clone()));

        assert_eq!(err.step(), Some(AnalysisStep::Quality));
        assert!(matches!(err, TrialAnalysisError::Step(ref f) if *f == failure));
        assert!(err.to_string().contains("monitor_quality"));
        assert!(err.to_string().contains("missing field `category`"));
    }

    #[test]
    fn other_graph_errors_stay_workflow_errors() {
        let err = TrialAnalysisError::from(GraphError::TaskNotFound("x".to_string()));
        assert!(matches!(err, TrialAnalysisError::Workflow(GraphError::TaskNotFound(_))));
        assert_eq!(err.step(), None);
    }

    #[test]
    fn only_schema_errors_are_permanent() {
        assert!(!CollaboratorError::schema("ProtocolFindings", "bad").is_transient());
        assert!(CollaboratorError::unavailable("503").is_transient());
        assert!(CollaboratorError::Timeout {
            after: Duration::from_secs(1)
        }
        .is_transient());
    }
}
