//! Configuration loading, validation, and management for PokeRAG.
//!
//! Loads configuration from `~/.pokerag/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Providers the factory knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["ollama", "openai"];

/// Vector store backends the factory knows how to build.
pub const KNOWN_BACKENDS: &[&str] = &["qdrant", "memory"];

/// Smallest prompt budget that still leaves room for the fixed template.
pub const MIN_PROMPT_TOKENS: usize = 256;

/// The root configuration structure.
///
/// Maps directly to `~/.pokerag/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedding and completion backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// Vector store backend
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Retrieval and prompt assembly
    #[serde(default)]
    pub rag: RagConfig,

    /// Conversation hard limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Crawl bounds for ingest
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai" (any OpenAI-compatible endpoint)
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens per answer; unset leaves it to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Bound on every embedding and completion call
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_chat_model() -> String {
    "llama3.2".into()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_top_p() -> f32 {
    0.9
}
fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            api_key: None,
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: None,
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// "qdrant" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Embedding dimensionality the collection is created with
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_store_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend() -> String {
    "qdrant".into()
}
fn default_qdrant_url() -> String {
    "http://localhost:6333".into()
}
fn default_collection() -> String {
    "pokemon".into()
}
fn default_dimension() -> usize {
    768
}
fn default_store_timeout() -> u64 {
    10
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
            dimension: default_dimension(),
            request_timeout_secs: default_store_timeout(),
        }
    }
}

impl std::fmt::Debug for VectorStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("api_key", &redact(&self.api_key))
            .field("collection", &self.collection)
            .field("dimension", &self.dimension)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,

    /// Default prompt budget; requests may lower it but never raise it
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: usize,

    /// HuggingFace `tokenizer.json` for exact token counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<PathBuf>,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    5
}
fn default_max_prompt_tokens() -> usize {
    4000
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            score_threshold: None,
            max_prompt_tokens: default_max_prompt_tokens(),
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    #[serde(default = "default_max_history_message_chars")]
    pub max_history_message_chars: usize,

    /// Ceiling on message plus history, in estimated tokens
    #[serde(default = "default_max_conversation_tokens")]
    pub max_conversation_tokens: usize,

    #[serde(default = "default_max_consecutive_newlines")]
    pub max_consecutive_newlines: usize,
}

fn default_max_message_chars() -> usize {
    1000
}
fn default_max_history_turns() -> usize {
    15
}
fn default_max_history_message_chars() -> usize {
    2000
}
fn default_max_conversation_tokens() -> usize {
    2500
}
fn default_max_consecutive_newlines() -> usize {
    3
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            max_history_turns: default_max_history_turns(),
            max_history_message_chars: default_max_history_message_chars(),
            max_conversation_tokens: default_max_conversation_tokens(),
            max_consecutive_newlines: default_max_consecutive_newlines(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_crawl_limit")]
    pub default_crawl_limit: usize,

    #[serde(default = "default_max_crawl_limit")]
    pub max_crawl_limit: usize,
}

fn default_crawl_limit() -> usize {
    10
}
fn default_max_crawl_limit() -> usize {
    151
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_crawl_limit: default_crawl_limit(),
            max_crawl_limit: default_max_crawl_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.pokerag/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `POKERAG_API_KEY`, then `OPENAI_API_KEY` (only if no key is configured)
    /// - `POKERAG_PROVIDER`, `POKERAG_BASE_URL` / `OLLAMA_HOST`
    /// - `POKERAG_CHAT_MODEL`, `POKERAG_EMBEDDING_MODEL`
    /// - `POKERAG_QDRANT_URL`, `POKERAG_COLLECTION`, `POKERAG_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load from `path` if given, else from the default location, then apply
    /// environment overrides and validate the result.
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir().join("config.toml"),
        };
        let mut config = Self::read_file(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = env("POKERAG_API_KEY").or_else(|| env("OPENAI_API_KEY"));
        }
        if let Some(provider) = env("POKERAG_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(url) = env("POKERAG_BASE_URL").or_else(|| env("OLLAMA_HOST")) {
            self.llm.base_url = url;
        }
        if let Some(model) = env("POKERAG_CHAT_MODEL") {
            self.llm.chat_model = model;
        }
        if let Some(model) = env("POKERAG_EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }
        if let Some(url) = env("POKERAG_QDRANT_URL") {
            self.vector_store.url = url;
        }
        if let Some(collection) = env("POKERAG_COLLECTION") {
            self.vector_store.collection = collection;
        }
        if let Some(port) = env("POKERAG_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid POKERAG_PORT"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pokerag")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown llm.provider '{}' (expected one of: {})",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }
        if !KNOWN_BACKENDS.contains(&self.vector_store.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown vector_store.backend '{}' (expected one of: {})",
                self.vector_store.backend,
                KNOWN_BACKENDS.join(", ")
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(self.llm.top_p > 0.0 && self.llm.top_p <= 1.0) {
            return Err(ConfigError::ValidationError(
                "llm.top_p must be in (0.0, 1.0]".into(),
            ));
        }
        if self.llm.request_timeout_secs == 0 || self.vector_store.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request timeouts must be at least 1 second".into(),
            ));
        }
        if self.vector_store.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "vector_store.dimension must be > 0".into(),
            ));
        }
        if self.rag.chunk_size == 0 || self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::ValidationError(
                "rag.chunk_overlap must be smaller than a non-zero rag.chunk_size".into(),
            ));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::ValidationError("rag.top_k must be > 0".into()));
        }
        if self.rag.max_prompt_tokens < MIN_PROMPT_TOKENS {
            return Err(ConfigError::ValidationError(format!(
                "rag.max_prompt_tokens must be at least {MIN_PROMPT_TOKENS}"
            )));
        }
        let l = &self.limits;
        if l.max_message_chars == 0
            || l.max_history_turns == 0
            || l.max_history_message_chars == 0
            || l.max_conversation_tokens == 0
            || l.max_consecutive_newlines == 0
        {
            return Err(ConfigError::ValidationError(
                "every [limits] value must be > 0".into(),
            ));
        }
        if self.ingest.default_crawl_limit > self.ingest.max_crawl_limit {
            return Err(ConfigError::ValidationError(
                "ingest.default_crawl_limit cannot exceed ingest.max_crawl_limit".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
