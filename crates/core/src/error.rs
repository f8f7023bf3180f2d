//! Error types for the PokeRAG domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! records *which step* of a request failed, so the HTTP layer can decide
//! between a client error, a retryable server error, and an opaque failure.

use thiserror::Error;

/// The top-level error type for chat and ingest operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    // --- Retrieval ---
    #[error("Embedding failed: {0}")]
    Embedding(ProviderError),

    #[error("Vector search failed: {0}")]
    Search(StoreError),

    // --- Generation ---
    #[error("Completion failed: {0}")]
    Completion(ProviderError),

    // --- Ingest ---
    #[error("Vector store error: {0}")]
    Store(#[from] StoreError),

    #[error("Ingest failed: all {attempted} items failed")]
    IngestFailed { attempted: usize, failed: usize },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the caller sent something we refuse to process.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True when replaying the whole request may succeed.
    ///
    /// Retrieval never leaves partial state behind, so both of its steps are
    /// safe to retry. Completion failures are left to the caller's judgement
    /// except for transient transport problems.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Embedding(_) | Error::Search(_) => true,
            Error::Completion(e) => e.is_transient(),
            Error::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    /// A message that is safe to show to an end user.
    ///
    /// Validation errors are returned verbatim (they only ever contain
    /// sanitized lengths and limits). Everything else is opaque.
    pub fn public_message(&self) -> String {
        match self {
            Error::Validation(v) => v.to_string(),
            Error::Embedding(_) | Error::Search(_) => {
                "The knowledge base is temporarily unavailable, please retry".into()
            }
            Error::Completion(_) => "The language model failed to answer, please retry".into(),
            Error::IngestFailed { .. } => "No documents could be ingested".into(),
            _ => "Internal server error".into(),
        }
    }
}

// --- Bounded context errors ---

/// Longest role string kept in [`ValidationError::InvalidRole`].
pub const MAX_ECHOED_ROLE_CHARS: usize = 32;

/// Why an inbound chat request was rejected.
///
/// The rendered messages never contain user text, so they can be shown
/// to clients as-is. `InvalidRole::role` holds the offending role after
/// sanitizing, capped at [`MAX_ECHOED_ROLE_CHARS`]. `PromptInjection` does
/// not say which heuristic matched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("message too long ({length} > {max} characters)")]
    MessageTooLong { length: usize, max: usize },

    #[error("message contains suspicious patterns")]
    PromptInjection,

    #[error("conversation history too long ({turns} > {max} turns)")]
    HistoryTooLong { turns: usize, max: usize },

    #[error("invalid role at history index {index} (must be 'user' or 'assistant')")]
    InvalidRole { index: usize, role: String },

    #[error("conversation message {index} too long ({length} > {max} characters)")]
    HistoryMessageTooLong {
        index: usize,
        length: usize,
        max: usize,
    },

    #[error("conversation too long ({tokens} > {max} tokens), please start a new session")]
    ConversationTooLong { tokens: usize, max: usize },
}

impl ValidationError {
    /// Stable machine-readable code for API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::EmptyMessage => "empty_message",
            ValidationError::MessageTooLong { .. } => "message_too_long",
            ValidationError::PromptInjection => "prompt_injection",
            ValidationError::HistoryTooLong { .. } => "history_too_long",
            ValidationError::InvalidRole { .. } => "invalid_role",
            ValidationError::HistoryMessageTooLong { .. } => "history_message_too_long",
            ValidationError::ConversationTooLong { .. } => "conversation_too_long",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider returned an empty result: {0}")]
    EmptyResponse(String),

    #[error("Invalid request options: {0}")]
    InvalidOptions(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Failures that usually clear up on their own.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),

    #[error("Vector store request failed: {message} (status: {status_code})")]
    Request { status_code: u16, message: String },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid point payload: {0}")]
    InvalidPayload(String),

    #[error("Vector store timed out: {0}")]
    Timeout(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::Timeout(_) => true,
            StoreError::Request { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// A failure confined to one item of an ingest batch.
#[derive(Debug, Clone, Error)]
pub enum IngestItemError {
    #[error("fetch failed for {locator}: {reason}")]
    Fetch { locator: String, reason: String },

    #[error("document {0} has no content")]
    EmptyDocument(String),

    #[error("embedding failed: {0}")]
    Embed(ProviderError),

    #[error("expected {expected} embeddings, got {actual}")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error("upsert failed: {0}")]
    Upsert(StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Completion(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn validation_is_client_error_and_not_retryable() {
        let err: Error = ValidationError::EmptyMessage.into();
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn retrieval_failures_are_retryable() {
        let embed = Error::Embedding(ProviderError::AuthenticationFailed("bad key".into()));
        let search = Error::Search(StoreError::Unavailable("connection refused".into()));
        assert!(embed.is_retryable());
        assert!(search.is_retryable());
        assert!(!embed.is_client_error());
    }

    #[test]
    fn completion_retry_depends_on_cause() {
        let timeout = Error::Completion(ProviderError::Timeout("30s".into()));
        let auth = Error::Completion(ProviderError::AuthenticationFailed("nope".into()));
        assert!(timeout.is_retryable());
        assert!(!auth.is_retryable());
    }

    #[test]
    fn public_message_hides_collaborator_details() {
        let err = Error::Search(StoreError::Request {
            status_code: 500,
            message: "qdrant panicked at segment 7".into(),
        });
        let msg = err.public_message();
        assert!(!msg.contains("qdrant"));
        assert!(!msg.contains("500"));
    }

    #[test]
    fn invalid_role_message_omits_the_role() {
        let err = Error::from(ValidationError::InvalidRole {
            index: 2,
            role: "<script>alert(1)</script>".into(),
        });
        let msg = err.public_message();
        assert!(!msg.contains("<script>"));
        assert!(!msg.contains("alert"));
        assert!(msg.contains("index 2"));
    }

    #[test]
    fn injection_message_is_generic() {
        let msg = ValidationError::PromptInjection.to_string();
        assert_eq!(msg, "message contains suspicious patterns");
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            ValidationError::EmptyMessage.kind(),
            ValidationError::MessageTooLong { length: 2, max: 1 }.kind(),
            ValidationError::PromptInjection.kind(),
            ValidationError::HistoryTooLong { turns: 2, max: 1 }.kind(),
            ValidationError::InvalidRole { index: 0, role: "x".into() }.kind(),
            ValidationError::HistoryMessageTooLong { index: 0, length: 2, max: 1 }.kind(),
            ValidationError::ConversationTooLong { tokens: 2, max: 1 }.kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}
