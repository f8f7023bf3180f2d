//! Wiring: turn an [`AppConfig`] into ready-to-use services.

use crate::context::{PromptAssembler, TokenEstimator};
use crate::ingest::{IngestPipeline, RecursiveChunker};
use crate::retrieval::Retriever;
use crate::safety::{ConversationValidator, ValidationLimits};
use crate::service::{ChatService, ChatSettings};
use pokerag_config::AppConfig;
use pokerag_core::error::Error;
use pokerag_core::provider::Provider;
use pokerag_core::source::CrawlSpec;
use pokerag_core::store::VectorStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything a front end needs, built once at startup.
pub struct Services {
    pub chat: ChatService,
    pub ingest: IngestPipeline,
    pub provider: Arc<dyn Provider>,
    pub store: Arc<dyn VectorStore>,
    crawl_default: usize,
    crawl_max: usize,
}

impl Services {
    /// Build providers and stores from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let provider = pokerag_providers::build_from_config(&config.llm).map_err(|e| Error::Config {
            message: format!("LLM provider: {e}"),
        })?;
        let store = pokerag_memory::build_from_config(&config.vector_store).map_err(|e| Error::Config {
            message: format!("vector store: {e}"),
        })?;
        Self::with_collaborators(config, provider, store)
    }

    /// Build around existing collaborators. One provider serves both
    /// embeddings and completions.
    pub fn with_collaborators(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, Error> {
        // The estimator is chosen once and shared so every budget
        // calculation in the process uses the same strategy.
        let estimator = Arc::new(TokenEstimator::from_config(config.rag.tokenizer_path.as_deref()));

        let settings = ChatSettings::from_config(config).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;

        let retriever = Retriever::new(provider.clone(), store.clone(), config.llm.embedding_model.clone())
            .with_score_threshold(config.rag.score_threshold)
            .with_timeout(Duration::from_secs(config.vector_store.request_timeout_secs.max(config.llm.request_timeout_secs)));

        let chat = ChatService::new(
            ConversationValidator::new(ValidationLimits::from(&config.limits), estimator.clone()),
            retriever,
            PromptAssembler::with_default_template(estimator.clone()),
            provider.clone(),
            settings,
        );

        let ingest = IngestPipeline::new(
            provider.clone(),
            store.clone(),
            RecursiveChunker::new(config.rag.chunk_size, config.rag.chunk_overlap),
            config.llm.embedding_model.clone(),
            config.vector_store.dimension,
        )
        .with_timeout(Duration::from_secs(config.llm.request_timeout_secs * 2));

        info!(
            provider = provider.name(),
            store = store.name(),
            estimator = estimator.strategy_name(),
            "Services ready"
        );

        Ok(Self {
            chat,
            ingest,
            provider,
            store,
            crawl_default: config.ingest.default_crawl_limit,
            crawl_max: config.ingest.max_crawl_limit,
        })
    }

    /// Apply the configured crawl default and cap.
    pub fn crawl_spec(&self, spec: CrawlSpec) -> CrawlSpec {
        spec.normalized(self.crawl_default, self.crawl_max)
    }
}
