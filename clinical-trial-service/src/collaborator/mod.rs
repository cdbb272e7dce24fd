//! The external text-generation service, seen through one method per response shape.

mod openrouter;
mod resilient;
#[cfg(test)]
pub(crate) mod scripted;
pub mod structured;

pub use openrouter::OpenRouterCollaborator;
pub use resilient::ResilientCollaborator;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::models::{ProtocolFindings, QualityIssue, SafetyAlert};

/// Capability the analysis steps depend on.
///
/// Each structured method must fail with [`CollaboratorError::Schema`] when the
/// service answers with something that does not validate as the requested shape.
#[async_trait]
pub trait Collaborator: Send + Sync {
    async fn extract_protocol(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<ProtocolFindings, CollaboratorError>;

    async fn extract_safety_alerts(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<Vec<SafetyAlert>, CollaboratorError>;

    async fn extract_quality_issues(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<Vec<QualityIssue>, CollaboratorError>;

    /// Unstructured completion, returned as-is
    async fn generate_text(&self, system: &str, prompt: &str) -> Result<String, CollaboratorError>;
}
