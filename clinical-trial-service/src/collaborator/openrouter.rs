use async_trait::async_trait;
use rig::{client::CompletionClient, completion::Prompt, providers::openrouter};
use tracing::{debug, info};

use super::{Collaborator, structured};
use crate::config::AnalysisConfig;
use crate::error::CollaboratorError;
use crate::models::{ProtocolFindings, QualityIssue, SafetyAlert};

/// [`Collaborator`] backed by an OpenRouter chat model through rig.
///
/// Structured calls append a JSON format instruction to the system prompt and
/// validate the answer with serde.
pub struct OpenRouterCollaborator {
    client: openrouter::Client,
    model: String,
    temperature: f64,
}

impl OpenRouterCollaborator {
    pub fn new(api_key: &str, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            client: openrouter::Client::new(api_key),
            model: model.into(),
            temperature,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(&config.openrouter_api_key, &config.model, config.temperature)
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, CollaboratorError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(system)
            .temperature(self.temperature)
            .build();

        debug!(model = %self.model, prompt_chars = prompt.len(), "sending completion request");
        let response = agent
            .prompt(prompt)
            .await
            .map_err(CollaboratorError::unavailable)?;
        info!(model = %self.model, response_chars = response.len(), "completion received");

        Ok(response)
    }
}

fn with_format(system: &str, format: &str) -> String {
    format!("{system}\n\n{format}")
}

#[async_trait]
impl Collaborator for OpenRouterCollaborator {
    async fn extract_protocol(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<ProtocolFindings, CollaboratorError> {
        let raw = self
            .complete(&with_format(system, structured::PROTOCOL_FORMAT), prompt)
            .await?;
        structured::parse_protocol(&raw)
    }

    async fn extract_safety_alerts(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<Vec<SafetyAlert>, CollaboratorError> {
        let raw = self
            .complete(&with_format(system, structured::SAFETY_FORMAT), prompt)
            .await?;
        structured::parse_safety_alerts(&raw)
    }

    async fn extract_quality_issues(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<Vec<QualityIssue>, CollaboratorError> {
        let raw = self
            .complete(&with_format(system, structured::QUALITY_FORMAT), prompt)
            .await?;
        structured::parse_quality_issues(&raw)
    }

    async fn generate_text(&self, system: &str, prompt: &str) -> Result<String, CollaboratorError> {
        self.complete(system, prompt).await
    }
}
