//! # PokeRAG Core
//!
//! Domain types, traits, and error definitions for the PokeRAG chatbot.
//! This crate has **zero framework dependencies**; it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM backend, vector store, document source)
//! is a trait here. Implementations live in their respective crates, so the
//! RAG pipeline can be tested end to end against in-process fakes.

pub mod error;
pub mod message;
pub mod provider;
pub mod source;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, IngestItemError, ProviderError, Result, StoreError, ValidationError};
pub use message::{ConversationHistory, ConversationTurn, IncomingTurn, Role};
pub use provider::{CompletionOptions, CompletionRequest, CompletionResponse, Provider};
pub use source::{CrawlSpec, DocumentSource, SourceDocument};
pub use store::{RetrievedPassage, ScoredPoint, SearchQuery, VectorPoint, VectorStore};
