//! The PokeRAG pipeline.
//!
//! A chat request flows through four stages:
//!
//! 1. **Validate**: sanitize the message and history, reject injection
//!    attempts, enforce the conversation limits ([`safety`])
//! 2. **Retrieve**: embed the question and fetch the nearest passages
//!    ([`retrieval`])
//! 3. **Assemble**: pack preamble, context, history and question into a
//!    fixed token budget ([`context`])
//! 4. **Complete**: send the prompt to the language model ([`service`])
//!
//! The knowledge base is filled by the [`ingest`] pipeline.

pub mod bootstrap;
pub mod context;
pub mod ingest;
pub mod retrieval;
pub mod safety;
pub mod service;

#[cfg(test)]
mod test_helpers;

pub use bootstrap::Services;
pub use context::{
    AssembledPrompt, AssemblyMetadata, PromptAssembler, PromptBudget, PromptTemplate,
    TokenEstimator,
};
pub use ingest::{DirectorySource, IngestPipeline, IngestReport, PokemonRecord, RecursiveChunker, StaticSource};
pub use retrieval::Retriever;
pub use safety::{ConversationValidator, Sanitizer, ValidatedChat, ValidationLimits};
pub use service::{ChatRequest, ChatResponse, ChatService, ChatSettings};
