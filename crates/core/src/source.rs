//! Document sources: where ingest gets its raw text.
//!
//! A source first lists locators (URLs, file paths, record names) for a
//! crawl, then fetches them one at a time so a single bad item can be
//! skipped without aborting the batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::error::IngestItemError;

/// Crawl limit used when the caller asks for zero items.
pub const DEFAULT_CRAWL_LIMIT: usize = 10;

/// Upper bound on a single crawl (the 151 Kanto Pokemon).
pub const MAX_CRAWL_LIMIT: usize = 151;

/// A raw document ready for chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Human-readable identifier, also used in logs.
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Which slice of a source to crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSpec {
    #[serde(default)]
    pub limit: usize,
    /// Number of leading locators to skip.
    #[serde(default)]
    pub start_from: usize,
}

impl CrawlSpec {
    pub fn new(limit: usize) -> Self {
        Self { limit, start_from: 0 }
    }

    /// Apply the default and the cap to `limit`.
    pub fn normalized(mut self, default_limit: usize, max_limit: usize) -> Self {
        if self.limit == 0 {
            self.limit = default_limit;
        }
        self.limit = self.limit.min(max_limit);
        self
    }
}

impl Default for CrawlSpec {
    fn default() -> Self {
        Self::new(DEFAULT_CRAWL_LIMIT)
    }
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    fn name(&self) -> &str;

    /// Locators for the crawl, in crawl order, at most `spec.limit` of them.
    async fn list(&self, spec: &CrawlSpec) -> Result<Vec<String>, IngestItemError>;

    /// Fetch one document.
    async fn fetch(&self, locator: &str) -> Result<SourceDocument, IngestItemError>;
}

/// Apply `start_from` and `limit` to an ordered list of locators.
pub fn select_locators(all: Vec<String>, spec: &CrawlSpec) -> Vec<String> {
    all.into_iter().skip(spec.start_from).take(spec.limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_uses_default() {
        let spec = CrawlSpec::new(0).normalized(DEFAULT_CRAWL_LIMIT, MAX_CRAWL_LIMIT);
        assert_eq!(spec.limit, 10);
    }

    #[test]
    fn limit_is_capped() {
        let spec = CrawlSpec::new(500).normalized(DEFAULT_CRAWL_LIMIT, MAX_CRAWL_LIMIT);
        assert_eq!(spec.limit, 151);
    }

    #[test]
    fn select_honours_start_and_limit() {
        let all: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let spec = CrawlSpec { limit: 2, start_from: 1 };
        assert_eq!(select_locators(all.clone(), &spec), vec!["b", "c"]);

        let past_end = CrawlSpec { limit: 2, start_from: 9 };
        assert!(select_locators(all, &past_end).is_empty());
    }
}
