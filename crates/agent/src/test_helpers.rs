//! Shared mock collaborators for unit tests.

use async_trait::async_trait;
use pokerag_core::error::{ProviderError, StoreError};
use pokerag_core::provider::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, Provider,
};
use pokerag_core::store::{ScoredPoint, SearchQuery, VectorPoint, VectorStore};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub const HASH_DIM: usize = 64;

/// Bag-of-words embedding: each lowercase word bumps one hashed dimension.
pub fn hash_embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; HASH_DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in word.to_lowercase().bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        v[(h % HASH_DIM as u64) as usize] += 1.0;
    }
    v
}

fn embed_all(request: EmbeddingRequest) -> EmbeddingResponse {
    EmbeddingResponse {
        embeddings: request.inputs.iter().map(|t| hash_embed(t)).collect(),
        model: request.model,
    }
}

/// Deterministic embeddings, no completions.
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn vector(&self, text: &str) -> Vec<f32> {
        hash_embed(text)
    }
}

#[async_trait]
impl Provider for HashEmbedder {
    fn name(&self) -> &str {
        "hash_embedder"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::NotConfigured("hash_embedder cannot complete".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(embed_all(request))
    }
}

/// Returns scripted answers in order and records every prompt it sees.
/// Embeds with [`hash_embed`].
pub struct ScriptedProvider {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.clone();
        self.prompts.lock().unwrap().push(request);
        let text = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "I don't know.".to_string());
        Ok(CompletionResponse { text, model, usage: None })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(embed_all(request))
    }
}

/// Every call fails with a network error.
#[derive(Default)]
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }

    async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Embeds successfully but returns no vectors.
pub struct EmptyEmbedder;

#[async_trait]
impl Provider for EmptyEmbedder {
    fn name(&self) -> &str {
        "empty"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::EmptyResponse("nothing".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse { embeddings: vec![], model: request.model })
    }
}

/// Sleeps before answering; used with paused tokio time.
pub struct SlowProvider {
    delay: Duration,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(CompletionResponse { text: "late".into(), model: request.model, usage: None })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(embed_all(request))
    }
}

/// A vector store that is always down.
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    fn name(&self) -> &str {
        "failing_store"
    }

    async fn ensure_collection(&self, _dimension: usize) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn upsert(&self, _points: Vec<VectorPoint>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn search(&self, _query: SearchQuery) -> Result<Vec<ScoredPoint>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
