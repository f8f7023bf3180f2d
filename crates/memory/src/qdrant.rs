//! Qdrant over its REST API.

use async_trait::async_trait;
use pokerag_core::error::StoreError;
use pokerag_core::store::{ScoredPoint, SearchQuery, VectorPoint, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct QdrantStore {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl QdrantStore {
    pub fn new(
        base_url: &str,
        collection: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_key,
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        self.with_key(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(e.to_string())
            } else {
                StoreError::Unavailable(e.to_string())
            }
        })
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, StoreError> {
        let response = self.send(self.client.get(self.collection_url())).await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let body: QdrantResponse<CollectionInfo> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidPayload(e.to_string()))?;
        Ok(Some(body.result))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status_code = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    warn!(status_code, body = %message, "Qdrant returned error");
    Err(StoreError::Request { status_code, message })
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<(), StoreError> {
        if let Some(info) = self.collection_info().await? {
            if let Some(size) = info.vector_size() {
                if size != dimension {
                    return Err(StoreError::DimensionMismatch {
                        expected: size,
                        actual: dimension,
                    });
                }
            }
            debug!(collection = %self.collection, "Collection exists");
            return Ok(());
        }

        let body = serde_json::json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        let response = self.send(self.client.put(self.collection_url()).json(&body)).await?;
        check_status(response).await?;
        info!(collection = %self.collection, dimension, "Created collection");
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), StoreError> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let body = UpsertBody {
            points: points
                .into_iter()
                .map(|p| WirePoint {
                    id: p.id,
                    vector: p.vector,
                    payload: p.payload,
                })
                .collect(),
        };
        let url = format!("{}/points?wait=true", self.collection_url());
        let response = self.send(self.client.put(url).json(&body)).await?;
        check_status(response).await?;
        debug!(collection = %self.collection, count, "Upserted points");
        Ok(())
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<ScoredPoint>, StoreError> {
        let body = SearchBody {
            vector: &query.vector,
            limit: query.limit,
            with_payload: true,
            score_threshold: query.score_threshold,
        };
        let url = format!("{}/points/search", self.collection_url());
        let response = self.send(self.client.post(url).json(&body)).await?;
        let response = check_status(response).await?;
        let body: QdrantResponse<Vec<WireHit>> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidPayload(e.to_string()))?;
        Ok(body.result.into_iter().map(WireHit::into_scored).collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self
            .collection_info()
            .await?
            .and_then(|info| info.points_count)
            .unwrap_or(0))
    }
}

// --- Qdrant wire types ---

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    points_count: Option<usize>,
    #[serde(default)]
    config: Value,
}

impl CollectionInfo {
    /// Size of the unnamed vector, when the collection has one.
    fn vector_size(&self) -> Option<usize> {
        self.config["params"]["vectors"]["size"]
            .as_u64()
            .map(|s| s as usize)
    }
}

#[derive(Debug, Serialize)]
struct UpsertBody {
    points: Vec<WirePoint>,
}

#[derive(Debug, Serialize)]
struct WirePoint {
    id: String,
    vector: Vec<f32>,
    payload: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct WireHit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<HashMap<String, Value>>,
}

impl WireHit {
    /// Qdrant ids are UUIDs or integers; payload values may be any JSON.
    fn into_scored(self) -> ScoredPoint {
        let id = match self.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let payload = self
            .payload
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();
        ScoredPoint {
            id,
            score: self.score,
            payload,
        }
    }
}
