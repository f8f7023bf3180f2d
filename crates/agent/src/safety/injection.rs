//! Prompt-injection heuristics.
//!
//! Two independent checks, OR-combined:
//!
//! - **Phrase patterns** for known attempts to override the system prompt.
//! - **Repetition** statistics that catch flooding and obfuscation which
//!   slip past the phrase list.
//!
//! Both are best-effort filters, not a security boundary. False positives
//! and negatives are expected.

use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Case-insensitive phrase templates.
const PATTERNS: &[&str] = &[
    r"(?i)(ignore|disregard|forget)\s+(all\s+)?(previous|above|all|prior)\s+(instructions?|prompts?|rules?)",
    r"(?i)you\s+are\s+(now|actually)\s+an?\b",
    r"(?i)new\s+instructions?\s*:",
    r"(?i)system\s*:",
    r"(?i)override\s+(the\s+)?(previous|above|all|prior)",
    r"(?i)act\s+as\s+if\s+you\s+are",
];

static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Texts shorter than this (in characters) skip the repetition check.
pub const MIN_REPETITION_LEN: usize = 20;

/// A single alphanumeric character may appear at most this many times.
pub const MAX_CHAR_REPEATS: usize = 50;

/// Word-share analysis needs more than this many words.
pub const MIN_WORDS_FOR_RATIO: usize = 10;

/// Maximum share of the text any single word may take.
pub const MAX_WORD_RATIO: f64 = 0.3;

/// True if `text` looks like an injection or flooding attempt.
pub fn is_suspicious(text: &str) -> bool {
    matches_known_pattern(text) || has_excessive_repetition(text)
}

/// Phrase-pattern heuristic alone.
pub fn matches_known_pattern(text: &str) -> bool {
    COMPILED.iter().any(|re| re.is_match(text))
}

/// Repetition heuristic alone.
pub fn has_excessive_repetition(text: &str) -> bool {
    if text.chars().count() < MIN_REPETITION_LEN {
        return false;
    }

    let mut char_counts: HashMap<char, usize> = HashMap::new();
    for c in text.chars().filter(|c| c.is_alphanumeric()) {
        let n = char_counts.entry(c).or_insert(0);
        *n += 1;
        if *n > MAX_CHAR_REPEATS {
            return true;
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > MIN_WORDS_FOR_RATIO {
        let mut word_counts: HashMap<String, usize> = HashMap::new();
        for w in &words {
            *word_counts.entry(w.to_lowercase()).or_insert(0) += 1;
        }
        let total = words.len() as f64;
        if word_counts.values().any(|&n| n as f64 / total > MAX_WORD_RATIO) {
            return true;
        }
    }

    false
}
