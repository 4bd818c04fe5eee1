//! # Ideaforge Models
//!
//! LLM provider selection shared by the agents and the coordinator config.
//!
//! API keys are never stored here; each radkit provider reads its own key from
//! the environment (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, ...).

use serde::{Deserialize, Serialize};

/// OpenAI-compatible endpoint used by the default configuration
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Model used by the default configuration
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Supported LLM providers
///
/// - Anthropic (Claude) - `ANTHROPIC_API_KEY`
/// - OpenAI and compatible gateways such as Groq - `OPENAI_API_KEY`
/// - Gemini (Google) - `GEMINI_API_KEY`
/// - OpenRouter (Gateway) - `OPENROUTER_API_KEY`
/// - Grok (xAI) - `XAI_API_KEY`
/// - DeepSeek - `DEEPSEEK_API_KEY`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
    OpenRouter,
    Grok,
    DeepSeek,
}

impl LlmProvider {
    /// Whether `base_url` is honored for this provider
    pub fn supports_base_url(&self) -> bool {
        matches!(self, LlmProvider::OpenAI)
    }
}

/// Which provider and model a stage generates with
///
/// ```rust,ignore
/// use ideaforge_core::models::{LlmProvider, ModelConfig};
///
/// // Groq-hosted Llama through the OpenAI-compatible client
/// let config = ModelConfig::default();
///
/// let claude = ModelConfig::with_provider(LlmProvider::Anthropic, "claude-sonnet-4-20250514");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    pub model: String,
    /// Base URL override for OpenAI-compatible APIs
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: DEFAULT_MODEL.to_string(),
            base_url: Some(GROQ_BASE_URL.to_string()),
        }
    }
}

impl ModelConfig {
    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// `base_url` if the provider can use it
    pub fn effective_base_url(&self) -> Option<&str> {
        if self.provider.supports_base_url() {
            self.base_url.as_deref()
        } else {
            None
        }
    }
}
