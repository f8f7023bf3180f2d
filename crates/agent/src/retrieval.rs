//! Retrieval orchestration: embed the query, ask the vector store for its
//! nearest neighbours, hand the passages to the assembler.
//!
//! Both collaborator calls run under a timeout. Dropping the future returned
//! by [`Retriever::retrieve`] aborts whichever call is in flight.

use pokerag_core::error::{Error, ProviderError, StoreError};
use pokerag_core::provider::{EmbeddingRequest, Provider};
use pokerag_core::store::{RetrievedPassage, SearchQuery, VectorStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct Retriever {
    embedder: Arc<dyn Provider>,
    store: Arc<dyn VectorStore>,
    embedding_model: String,
    score_threshold: Option<f32>,
    timeout: Duration,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Provider>,
        store: Arc<dyn VectorStore>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            embedding_model: embedding_model.into(),
            score_threshold: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Top-`top_k` passages for `query`, in the store's ranking order.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>, Error> {
        let vector = self.embed_query(query).await?;

        let search = self.store.search(SearchQuery {
            vector,
            limit: top_k,
            score_threshold: self.score_threshold,
        });
        let hits = tokio::time::timeout(self.timeout, search)
            .await
            .map_err(|_| {
                Error::Search(StoreError::Timeout(format!(
                    "search exceeded {}s",
                    self.timeout.as_secs()
                )))
            })?
            .map_err(Error::Search)?;

        let passages: Vec<RetrievedPassage> = hits.into_iter().map(RetrievedPassage::from).collect();

        info!(
            store = self.store.name(),
            top_k,
            hits = passages.len(),
            best_score = passages.first().map(|p| p.score),
            "Retrieved passages"
        );

        Ok(passages)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, Error> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            inputs: vec![query.to_string()],
        };

        let response = tokio::time::timeout(self.timeout, self.embedder.embed(request))
            .await
            .map_err(|_| {
                Error::Embedding(ProviderError::Timeout(format!(
                    "embedding exceeded {}s",
                    self.timeout.as_secs()
                )))
            })?
            .map_err(Error::Embedding)?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::Embedding(ProviderError::EmptyResponse(
                    "no embedding returned for query".into(),
                ))
            })?;

        debug!(provider = self.embedder.name(), dimension = vector.len(), "Embedded query");
        Ok(vector)
    }
}

/// Citation label for a passage: `Pokemon: X` when the passage names one,
/// otherwise its `source`.
pub fn source_label(passage: &RetrievedPassage) -> Option<String> {
    if let Some(name) = passage.metadata.get("pokemon").filter(|s| !s.is_empty()) {
        return Some(format!("Pokemon: {name}"));
    }
    passage
        .metadata
        .get("source")
        .filter(|s| !s.is_empty())
        .cloned()
}

/// Distinct source labels, first-seen order.
pub fn dedup_sources(passages: &[RetrievedPassage]) -> Vec<String> {
    let mut seen = HashSet::new();
    passages
        .iter()
        .filter_map(source_label)
        .filter(|label| seen.insert(label.clone()))
        .collect()
}
