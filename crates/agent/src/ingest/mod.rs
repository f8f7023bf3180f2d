//! Knowledge-base ingest.

pub mod chunker;
pub mod pipeline;
pub mod pokemon;
pub mod source;

pub use chunker::RecursiveChunker;
pub use pipeline::{IngestPipeline, IngestReport};
pub use pokemon::{BaseStats, PokemonRecord};
pub use source::{DirectorySource, StaticSource};
