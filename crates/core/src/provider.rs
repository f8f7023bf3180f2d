//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider turns a fully assembled prompt into an answer, and texts into
//! embedding vectors. The RAG pipeline never knows which backend it talks to.
//!
//! Implementations: Ollama, OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// Sampling options for a completion.
///
/// Defaults favour factual answers: low temperature, slightly narrowed
/// nucleus sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Temperature, `0.0..=2.0`. Default `0.3`.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling mass, `(0.0, 1.0]`. Default `0.9`.
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens to generate; `None` leaves it to the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    0.9
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: None,
        }
    }
}

impl CompletionOptions {
    /// Build options, rejecting out-of-range values.
    pub fn new(temperature: f32, top_p: f32, max_tokens: Option<u32>) -> Result<Self, ProviderError> {
        let options = Self { temperature, top_p, max_tokens };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ProviderError::InvalidOptions(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ProviderError::InvalidOptions(format!(
                "top_p must be within (0.0, 1.0], got {}",
                self.top_p
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(ProviderError::InvalidOptions("max_tokens must be positive".into()));
        }
        Ok(())
    }
}

/// A single-prompt completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "llama3.2", "gpt-4o-mini")
    pub model: String,

    /// The assembled prompt
    pub prompt: String,

    #[serde(default)]
    pub options: CompletionOptions,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub text: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "nomic-embed-text").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The chat service calls
/// `complete()` and the retriever calls `embed()` without knowing which
/// provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Send a prompt and get a complete response.
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError>;

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation returns an error indicating embeddings aren't supported.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::NotConfigured(
            format!("Provider '{}' does not support embeddings", self.name()),
        ))
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
