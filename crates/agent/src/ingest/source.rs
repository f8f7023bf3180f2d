//! Concrete document sources.

use crate::ingest::pokemon::PokemonRecord;
use async_trait::async_trait;
use pokerag_core::error::IngestItemError;
use pokerag_core::source::{select_locators, CrawlSpec, DocumentSource, SourceDocument};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A fixed, in-memory list of documents.
///
/// Locators are positional (`"{index}:{name}"`), so documents that share a
/// name are still fetched individually.
pub struct StaticSource {
    documents: Vec<SourceDocument>,
}

impl StaticSource {
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self { documents }
    }

    pub fn from_pokemon(records: &[PokemonRecord]) -> Self {
        Self::new(records.iter().map(PokemonRecord::to_document).collect())
    }

    fn not_found(locator: &str) -> IngestItemError {
        IngestItemError::Fetch {
            locator: locator.to_string(),
            reason: "no such document".into(),
        }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn list(&self, spec: &CrawlSpec) -> Result<Vec<String>, IngestItemError> {
        let locators = self
            .documents
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{i}:{}", d.name))
            .collect();
        Ok(select_locators(locators, spec))
    }

    async fn fetch(&self, locator: &str) -> Result<SourceDocument, IngestItemError> {
        locator
            .split_once(':')
            .and_then(|(index, _)| index.parse::<usize>().ok())
            .and_then(|index| self.documents.get(index))
            .cloned()
            .ok_or_else(|| Self::not_found(locator))
    }
}

/// Reads documents from a directory.
///
/// - `*.txt` / `*.md`: one document per file, named after the file stem.
/// - `*.json`: a list of Pokemon records, one document per record,
///   addressed as `file.json#index`.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn fetch_error(locator: &str, reason: impl ToString) -> IngestItemError {
        IngestItemError::Fetch {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }

    async fn read_records(&self, path: &Path, locator: &str) -> Result<Vec<PokemonRecord>, IngestItemError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Self::fetch_error(locator, e))?;
        serde_json::from_str(&raw).map_err(|e| Self::fetch_error(locator, e))
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[async_trait]
impl DocumentSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn list(&self, spec: &CrawlSpec) -> Result<Vec<String>, IngestItemError> {
        let root = self.root.display().to_string();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Self::fetch_error(&root, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::fetch_error(&root, e))?
        {
            let path = entry.path();
            if matches!(extension(&path).as_deref(), Some("txt" | "md" | "json")) {
                files.push(path);
            }
        }
        files.sort();

        let mut locators = Vec::new();
        for path in files {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if extension(&path).as_deref() == Some("json") {
                // An unreadable JSON file still yields one locator so that
                // fetching it is counted as a failed item.
                match self.read_records(&path, file_name).await {
                    Ok(records) => {
                        locators.extend((0..records.len()).map(|i| format!("{file_name}#{i}")));
                    }
                    Err(_) => locators.push(format!("{file_name}#0")),
                }
            } else {
                locators.push(file_name.to_string());
            }
        }

        debug!(root = %root, found = locators.len(), "Listed directory source");
        Ok(select_locators(locators, spec))
    }

    async fn fetch(&self, locator: &str) -> Result<SourceDocument, IngestItemError> {
        if let Some((file_name, index)) = locator.rsplit_once('#') {
            let index: usize = index
                .parse()
                .map_err(|_| Self::fetch_error(locator, "invalid record index"))?;
            let records = self.read_records(&self.root.join(file_name), locator).await?;
            let record = records
                .get(index)
                .ok_or_else(|| Self::fetch_error(locator, "record index out of range"))?;
            return Ok(record.to_document());
        }

        let path = self.root.join(locator);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Self::fetch_error(locator, e))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(locator)
            .to_string();
        Ok(SourceDocument::new(name, content)
            .with_metadata("source", locator)
            .with_metadata("path", path.display().to_string()))
    }
}
