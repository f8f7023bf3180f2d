//! Ingest pipeline: fetch → chunk → embed → upsert.
//!
//! Items are processed one at a time. A failing item is logged and counted;
//! the batch carries on with the next one.

use crate::ingest::chunker::RecursiveChunker;
use pokerag_core::error::{Error, IngestItemError, ProviderError, StoreError};
use pokerag_core::provider::{EmbeddingRequest, Provider};
use pokerag_core::source::{CrawlSpec, DocumentSource, SourceDocument};
use pokerag_core::store::{VectorPoint, VectorStore, CONTENT_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of one ingest batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub chunks_stored: usize,
    /// Items left out by the crawl window before any was attempted.
    #[serde(default)]
    pub skipped: usize,
}

pub struct IngestPipeline {
    embedder: Arc<dyn Provider>,
    store: Arc<dyn VectorStore>,
    chunker: RecursiveChunker,
    embedding_model: String,
    dimension: usize,
    timeout: Duration,
}

impl IngestPipeline {
    pub fn new(
        embedder: Arc<dyn Provider>,
        store: Arc<dyn VectorStore>,
        chunker: RecursiveChunker,
        embedding_model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker,
            embedding_model: embedding_model.into(),
            dimension,
            timeout: Duration::from_secs(60),
        }
    }

    /// Per-call timeout for embedding and upsert.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ingest documents that are already in hand.
    pub async fn ingest_documents(&self, documents: Vec<SourceDocument>) -> Result<IngestReport, Error> {
        self.store.ensure_collection(self.dimension).await?;

        let mut report = IngestReport {
            attempted: documents.len(),
            ..Default::default()
        };
        for doc in documents {
            let name = doc.name.clone();
            self.record(&mut report, &name, self.ingest_one(doc).await);
        }
        finish(report)
    }

    /// Crawl `source` and ingest what it yields.
    pub async fn ingest_from(&self, source: &dyn DocumentSource, spec: CrawlSpec) -> Result<IngestReport, Error> {
        let locators = source.list(&spec).await.map_err(|e| {
            warn!(source = source.name(), error = %e, "Listing source failed");
            Error::Internal(format!("listing source {} failed: {e}", source.name()))
        })?;

        self.store.ensure_collection(self.dimension).await?;

        info!(source = source.name(), items = locators.len(), "Starting ingest");
        let mut report = IngestReport {
            attempted: locators.len(),
            ..Default::default()
        };
        for locator in &locators {
            let outcome = match source.fetch(locator).await {
                Ok(doc) => self.ingest_one(doc).await,
                Err(e) => Err(e),
            };
            self.record(&mut report, locator, outcome);
        }
        finish(report)
    }

    fn record(&self, report: &mut IngestReport, item: &str, outcome: Result<usize, IngestItemError>) {
        match outcome {
            Ok(chunks) => {
                report.succeeded += 1;
                report.chunks_stored += chunks;
                info!(item, chunks, "Ingested document");
            }
            Err(e) => {
                report.failed += 1;
                warn!(item, error = %e, "Skipping document");
            }
        }
    }

    /// Chunk, embed, and store one document. Returns the number of chunks stored.
    async fn ingest_one(&self, doc: SourceDocument) -> Result<usize, IngestItemError> {
        let chunks = self.chunker.split(&doc.content);
        if chunks.is_empty() {
            return Err(IngestItemError::EmptyDocument(doc.name));
        }

        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            inputs: chunks.clone(),
        };
        let response = tokio::time::timeout(self.timeout, self.embedder.embed(request))
            .await
            .map_err(|_| {
                IngestItemError::Embed(ProviderError::Timeout(format!(
                    "embedding exceeded {}s",
                    self.timeout.as_secs()
                )))
            })?
            .map_err(IngestItemError::Embed)?;

        if response.embeddings.len() != chunks.len() {
            return Err(IngestItemError::EmbeddingCountMismatch {
                expected: chunks.len(),
                actual: response.embeddings.len(),
            });
        }

        let total = chunks.len();
        let points: Vec<VectorPoint> = chunks
            .into_iter()
            .zip(response.embeddings)
            .enumerate()
            .map(|(j, (content, vector))| {
                let mut payload = doc.metadata.clone();
                payload.insert(CONTENT_KEY.to_string(), content);
                payload.insert("chunk".to_string(), format!("{}/{}", j + 1, total));
                VectorPoint {
                    id: uuid::Uuid::new_v4().to_string(),
                    vector,
                    payload,
                }
            })
            .collect();

        tokio::time::timeout(self.timeout, self.store.upsert(points))
            .await
            .map_err(|_| {
                IngestItemError::Upsert(StoreError::Timeout(format!(
                    "upsert exceeded {}s",
                    self.timeout.as_secs()
                )))
            })?
            .map_err(IngestItemError::Upsert)?;

        Ok(total)
    }
}

fn finish(report: IngestReport) -> Result<IngestReport, Error> {
    if report.attempted > 0 && report.succeeded == 0 {
        return Err(Error::IngestFailed {
            attempted: report.attempted,
            failed: report.failed,
        });
    }
    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        chunks = report.chunks_stored,
        "Ingest finished"
    );
    Ok(report)
}
