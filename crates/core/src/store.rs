//! Vector store trait: the nearest-neighbour oracle behind retrieval.
//!
//! The store is a black box: it keeps `(id, vector, payload)` points and
//! answers similarity queries ranked by descending score. Ranking is the
//! store's contract; callers preserve whatever order it returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::error::StoreError;

/// Payload key under which the chunk text is stored.
pub const CONTENT_KEY: &str = "content";

/// A point to insert or replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, String>,
}

/// A nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    /// Drop hits scoring below this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, String>,
}

/// A passage handed to the prompt assembler. Lives for a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub content: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RetrievedPassage {
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            score,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<ScoredPoint> for RetrievedPassage {
    fn from(mut point: ScoredPoint) -> Self {
        let content = point.payload.remove(CONTENT_KEY).unwrap_or_default();
        Self {
            content,
            score: point.score,
            metadata: point.payload,
        }
    }
}

/// The vector store abstraction.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// A human-readable name for this backend (e.g., "qdrant", "in_memory").
    fn name(&self) -> &str;

    /// Create the collection with cosine distance if it does not exist yet.
    async fn ensure_collection(&self, dimension: usize) -> Result<(), StoreError>;

    /// Insert or replace points by id.
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), StoreError>;

    /// Nearest neighbours of `query.vector`, best first.
    async fn search(&self, query: SearchQuery) -> Result<Vec<ScoredPoint>, StoreError>;

    /// Number of stored points.
    async fn count(&self) -> Result<usize, StoreError>;
}
