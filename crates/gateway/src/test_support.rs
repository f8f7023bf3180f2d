//! Mock collaborators for router tests.

use crate::{GatewayState, SharedState};
use async_trait::async_trait;
use pokerag_agent::Services;
use pokerag_config::AppConfig;
use pokerag_core::error::ProviderError;
use pokerag_core::provider::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Provider,
};
use pokerag_memory::InMemoryStore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const DIM: usize = 32;

/// Hashed bag-of-words embeddings plus scripted answers.
pub struct MockProvider {
    answers: Mutex<VecDeque<String>>,
}

impl MockProvider {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|s| s.to_string()).collect()),
        }
    }
}

fn embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let h = word
            .to_lowercase()
            .bytes()
            .fold(5381u32, |h, b| h.wrapping_mul(33) ^ b as u32);
        v[h as usize % DIM] += 1.0;
    }
    v
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "gateway_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let text = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "Mock answer".into());
        Ok(CompletionResponse {
            text,
            model: request.model,
            usage: None,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| embed(t)).collect(),
            model: request.model,
        })
    }
}

pub fn test_state(answers: &[&str]) -> SharedState {
    let mut config = AppConfig::default();
    config.vector_store.backend = "memory".into();
    config.vector_store.dimension = DIM;
    let services = Services::with_collaborators(
        &config,
        Arc::new(MockProvider::new(answers)),
        Arc::new(InMemoryStore::new()),
    )
    .unwrap();
    Arc::new(GatewayState::new(services))
}
