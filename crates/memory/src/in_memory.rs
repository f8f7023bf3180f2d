//! In-memory vector store, useful for tests, demos and the `memory` backend.

use crate::vector::rank_points;
use async_trait::async_trait;
use pokerag_core::error::StoreError;
use pokerag_core::store::{ScoredPoint, SearchQuery, VectorPoint, VectorStore};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Collection {
    dimension: Option<usize>,
    points: Vec<VectorPoint>,
}

/// Brute-force cosine search over a `Vec`. Nothing is persisted.
pub struct InMemoryStore {
    inner: Arc<RwLock<Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Collection::default())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_dimension(expected: Option<usize>, actual: usize) -> Result<(), StoreError> {
    match expected {
        Some(expected) if expected != actual => Err(StoreError::DimensionMismatch { expected, actual }),
        _ => Ok(()),
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.dimension {
            Some(existing) if existing != dimension => Err(StoreError::DimensionMismatch {
                expected: existing,
                actual: dimension,
            }),
            _ => {
                inner.dimension = Some(dimension);
                Ok(())
            }
        }
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for p in &points {
            check_dimension(inner.dimension, p.vector.len())?;
        }
        for point in points {
            match inner.points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => inner.points.push(point),
            }
        }
        Ok(())
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<ScoredPoint>, StoreError> {
        let inner = self.inner.read().await;
        check_dimension(inner.dimension, query.vector.len())?;
        Ok(rank_points(&inner.points, &query))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.points.len())
    }
}
