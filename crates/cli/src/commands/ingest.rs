//! `pokerag ingest`: Load documents or Pokemon records into the vector store.

use pokerag_agent::ingest::{DirectorySource, PokemonRecord, StaticSource};
use pokerag_agent::Services;
use pokerag_core::source::{CrawlSpec, DocumentSource};
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    path: &Path,
    limit: usize,
    start_from: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let services = Services::from_config(&config)?;
    let spec = services.crawl_spec(CrawlSpec { limit, start_from });

    let source: Box<dyn DocumentSource> = if path.is_dir() {
        Box::new(DirectorySource::new(path))
    } else {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let records: Vec<PokemonRecord> = serde_json::from_str(&raw)
            .map_err(|e| format!("{} is not a list of Pokemon records: {e}", path.display()))?;
        Box::new(StaticSource::from_pokemon(&records))
    };

    println!(
        "Ingesting from {} (limit {}, starting at {})",
        path.display(),
        spec.limit,
        spec.start_from
    );

    let report = services.ingest.ingest_from(source.as_ref(), spec).await?;

    println!("   Attempted: {}", report.attempted);
    println!("   Succeeded: {}", report.succeeded);
    println!("   Failed:    {}", report.failed);
    println!("   Chunks:    {}", report.chunks_stored);

    Ok(())
}
