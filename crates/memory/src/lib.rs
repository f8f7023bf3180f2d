//! Vector store backends for PokeRAG.

pub mod in_memory;
pub mod qdrant;
pub mod vector;

pub use in_memory::InMemoryStore;
pub use qdrant::QdrantStore;
pub use vector::{cosine_similarity, rank_points};

use pokerag_config::VectorStoreConfig;
use pokerag_core::error::StoreError;
use pokerag_core::store::VectorStore;
use std::sync::Arc;
use std::time::Duration;

/// Construct the store named by `config.backend`.
pub fn build_from_config(config: &VectorStoreConfig) -> Result<Arc<dyn VectorStore>, StoreError> {
    match config.backend.as_str() {
        "qdrant" => Ok(Arc::new(QdrantStore::new(
            &config.url,
            config.collection.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?)),
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        other => Err(StoreError::Unavailable(format!("unknown vector store backend '{other}'"))),
    }
}
