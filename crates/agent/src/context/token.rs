//! Token estimation.
//!
//! The strategy is picked once, when the estimator is built, and never
//! changes afterwards: budget arithmetic assumes stable costs for the whole
//! process. Build one [`TokenEstimator`], wrap it in an `Arc`, and hand it to
//! every consumer.
//!
//! - **Encoder**: exact sub-word counts from a HuggingFace `tokenizer.json`
//!   (requires the `hf-tokenizer` feature).
//! - **CharRatio**: 1 token ≈ 4 characters, rounded up. Used whenever no
//!   encoder is configured or it fails to load.

use std::path::Path;
use tracing::{info, warn};

/// Characters per token for the fallback heuristic.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate tokens with the character heuristic: `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

enum Strategy {
    CharRatio,
    #[cfg(feature = "hf-tokenizer")]
    Encoder(Box<tokenizers::Tokenizer>),
}

/// Maps text to a non-negative token cost.
pub struct TokenEstimator {
    strategy: Strategy,
}

impl TokenEstimator {
    /// The character-ratio estimator.
    pub fn char_ratio() -> Self {
        Self {
            strategy: Strategy::CharRatio,
        }
    }

    /// Try to load an exact encoder from `path`, falling back to the
    /// character ratio on any failure. Never fails.
    pub fn from_tokenizer_file(path: &Path) -> Self {
        #[cfg(feature = "hf-tokenizer")]
        {
            match tokenizers::Tokenizer::from_file(path) {
                Ok(tokenizer) => {
                    info!(path = %path.display(), "Loaded tokenizer for exact token counts");
                    return Self {
                        strategy: Strategy::Encoder(Box::new(tokenizer)),
                    };
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load tokenizer, falling back to character estimate"
                    );
                }
            }
        }
        #[cfg(not(feature = "hf-tokenizer"))]
        {
            warn!(
                path = %path.display(),
                "Built without the hf-tokenizer feature, falling back to character estimate"
            );
        }
        Self::char_ratio()
    }

    /// Build from an optional tokenizer path.
    pub fn from_config(tokenizer_path: Option<&Path>) -> Self {
        match tokenizer_path {
            Some(path) => Self::from_tokenizer_file(path),
            None => {
                info!("No tokenizer configured, using character estimate");
                Self::char_ratio()
            }
        }
    }

    /// "encoder" or "char_ratio".
    pub fn strategy_name(&self) -> &'static str {
        match self.strategy {
            Strategy::CharRatio => "char_ratio",
            #[cfg(feature = "hf-tokenizer")]
            Strategy::Encoder(_) => "encoder",
        }
    }

    pub fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match &self.strategy {
            Strategy::CharRatio => estimate_tokens(text),
            #[cfg(feature = "hf-tokenizer")]
            Strategy::Encoder(tokenizer) => tokenizer
                .encode(text, false)
                .map(|encoding| encoding.len())
                .unwrap_or_else(|_| estimate_tokens(text)),
        }
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::char_ratio()
    }
}

impl std::fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEstimator")
            .field("strategy", &self.strategy_name())
            .finish()
    }
}
