//! # Generation Capability
//!
//! The text-generation dependency of the agents, treated as an opaque
//! `prompt -> text | error` function behind the [`Generator`] trait.
//!
//! [`Generation`] wraps a generator with the stage timeout and the
//! [`FailurePolicy`] that decides whether a failure flows downstream as text
//! or halts the workflow. Failures are never retried.

use crate::models::{LlmProvider, ModelConfig};
use async_trait::async_trait;
use radkit::agent::LlmFunction;
use radkit::macros::LLMOutput;
use radkit::models::providers::{
    AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One call to the generation capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Agent issuing the request
    pub agent: String,
    /// System instructions for the stage
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(agent: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            system: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Why a generation produced no text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Provider(String),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("model returned no text")]
    Empty,
}

/// The text-generation capability
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// What to do when a stage's generation fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Forward `"<Agent> Error: <reason>"` downstream as the artifact
    #[default]
    Forward,
    /// Record stage `failed` and stop the workflow at this stage
    Halt,
}

/// Outcome of one stage generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageArtifact {
    Generated(String),
    Failed(GenerationError),
}

/// A generator bound to a timeout and failure policy
#[derive(Clone)]
pub struct Generation {
    generator: Arc<dyn Generator>,
    timeout: Duration,
    policy: FailurePolicy,
}

impl Generation {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration, policy: FailurePolicy) -> Self {
        Self {
            generator,
            timeout,
            policy,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Call the generator once, bounded by the timeout
    pub async fn run(&self, request: GenerationRequest) -> StageArtifact {
        match tokio::time::timeout(self.timeout, self.generator.generate(&request)).await {
            Ok(Ok(text)) if text.trim().is_empty() => StageArtifact::Failed(GenerationError::Empty),
            Ok(Ok(text)) => StageArtifact::Generated(text),
            Ok(Err(e)) => StageArtifact::Failed(e),
            Err(_) => StageArtifact::Failed(GenerationError::Timeout(self.timeout)),
        }
    }
}

/// Structured wrapper the LLM fills in for every stage
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct StageDraft {
    /// The complete markdown text for this stage
    pub content: String,
}

/// Generator backed by a radkit LLM provider
#[derive(Debug, Clone)]
pub struct LlmGenerator {
    config: ModelConfig,
}

impl LlmGenerator {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// `LlmFunction` needs a concrete `BaseLlm`, so match the provider here
    /// and hand the concrete client to [`run_function`].
    async fn draft(&self, system: &str, prompt: String) -> anyhow::Result<StageDraft> {
        let config = &self.config;
        match config.provider {
            LlmProvider::Anthropic => {
                run_function(AnthropicLlm::from_env(&config.model)?, system, prompt).await
            }
            LlmProvider::OpenAI => {
                let mut llm = OpenAILlm::from_env(&config.model)?;
                if let Some(base_url) = config.effective_base_url() {
                    llm = llm.with_base_url(base_url);
                }
                run_function(llm, system, prompt).await
            }
            LlmProvider::Gemini => {
                run_function(GeminiLlm::from_env(&config.model)?, system, prompt).await
            }
            LlmProvider::OpenRouter => {
                run_function(OpenRouterLlm::from_env(&config.model)?, system, prompt).await
            }
            LlmProvider::Grok => {
                run_function(GrokLlm::from_env(&config.model)?, system, prompt).await
            }
            LlmProvider::DeepSeek => {
                run_function(DeepSeekLlm::from_env(&config.model)?, system, prompt).await
            }
        }
    }
}

/// Run a single-shot `StageDraft` function on any concrete LLM type
async fn run_function<L: radkit::models::BaseLlm + 'static>(
    llm: L,
    system: &str,
    prompt: String,
) -> anyhow::Result<StageDraft> {
    let func = LlmFunction::<StageDraft>::new_with_system_instructions(llm, system);
    let draft = func.run(prompt).await?;
    Ok(draft)
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let system = request.system.as_deref().unwrap_or_default();
        tracing::debug!(
            agent = %request.agent,
            provider = ?self.config.provider,
            model = %self.config.model,
            "Calling LLM"
        );
        let draft = self
            .draft(system, request.prompt.clone())
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))?;
        Ok(draft.content.trim().to_string())
    }
}

/// Deterministic offline generator, useful without API keys
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(format!("[{} draft] {}", request.agent, request.prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl Generator for Failing {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            Err(GenerationError::Provider("rate limited".to_string()))
        }
    }

    struct Stalling;

    #[async_trait]
    impl Generator for Stalling {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".to_string())
        }
    }

    struct Blank;

    #[async_trait]
    impl Generator for Blank {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            Ok("   ".to_string())
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("DesignAgent", "Design a lamp").with_system("You design.")
    }

    #[tokio::test]
    async fn test_echo_generator() {
        let generation = Generation::new(
            Arc::new(EchoGenerator),
            Duration::from_secs(1),
            FailurePolicy::Forward,
        );
        assert_eq!(
            generation.run(request()).await,
            StageArtifact::Generated("[DesignAgent draft] Design a lamp".to_string())
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let generation = Generation::new(
            Arc::new(Failing),
            Duration::from_secs(1),
            FailurePolicy::Halt,
        );
        let artifact = generation.run(request()).await;
        assert_eq!(
            artifact,
            StageArtifact::Failed(GenerationError::Provider("rate limited".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_failure() {
        let generation = Generation::new(
            Arc::new(Stalling),
            Duration::from_secs(30),
            FailurePolicy::Forward,
        );
        let artifact = generation.run(request()).await;
        assert_eq!(
            artifact,
            StageArtifact::Failed(GenerationError::Timeout(Duration::from_secs(30)))
        );
    }

    #[tokio::test]
    async fn test_blank_output_is_a_failure() {
        let generation = Generation::new(
            Arc::new(Blank),
            Duration::from_secs(1),
            FailurePolicy::Forward,
        );
        assert_eq!(
            generation.run(request()).await,
            StageArtifact::Failed(GenerationError::Empty)
        );
    }

    #[test]
    fn test_failure_policy_serialization() {
        assert_eq!(
            serde_json::to_string(&FailurePolicy::Halt).unwrap(),
            "\"halt\""
        );
        assert_eq!(FailurePolicy::default(), FailurePolicy::Forward);
    }
}
