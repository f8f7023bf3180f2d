//! Completion and embedding backends for PokeRAG.
//!
//! All backends implement the `pokerag_core::Provider` trait.
//! [`build_from_config`] picks one from the `[llm]` config section.

mod http;
pub mod ollama;
pub mod openai_compat;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;

use pokerag_config::LlmConfig;
use pokerag_core::error::ProviderError;
use pokerag_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Construct the provider named by `config.provider`.
pub fn build_from_config(config: &LlmConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new(&config.base_url, timeout)?)),
        "openai" => {
            let api_key = config.api_key.clone().unwrap_or_default();
            Ok(Arc::new(OpenAiCompatProvider::new(
                "openai",
                &config.base_url,
                api_key,
                timeout,
            )?))
        }
        other => Err(ProviderError::NotConfigured(format!("unknown provider '{other}'"))),
    }
}
