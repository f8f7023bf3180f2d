//! Recursive character text splitting.
//!
//! Splits on the first separator present in the text, merges the pieces
//! back into chunks of at most `chunk_size` characters with `chunk_overlap`
//! characters carried over between neighbours, and recurses with the next
//! separator on any piece that is still too large.

use std::collections::VecDeque;

/// Section breaks, paragraphs, lines, sentences, words.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n===", "\n\n", "\n", ". ", " "];

#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// `chunk_overlap` is clamped below `chunk_size`; `chunk_size` to at least 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `text` into chunks. Text shorter than `chunk_size` comes back
    /// whole (trimmed); blank text yields nothing.
    pub fn split(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if char_len(trimmed) < self.chunk_size {
            return vec![trimmed.to_string()];
        }
        self.split_recursive(trimmed, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the first separator that occurs; fall back to characters.
        let (separator, rest) = match separators.iter().position(|s| !s.is_empty() && text.contains(s.as_str())) {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => ("", &separators[separators.len()..]),
        };

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut small: Vec<String> = Vec::new();
        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge(&small, separator));
                small.clear();
            }
            if rest.is_empty() || separator.is_empty() {
                chunks.extend(self.hard_split(&piece));
            } else {
                chunks.extend(self.split_recursive(&piece, rest));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge(&small, separator));
        }
        chunks
    }

    /// Greedily join pieces up to `chunk_size`, keeping a tail of up to
    /// `chunk_overlap` characters as the start of the next chunk.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            let joined_len = |window: &VecDeque<&str>, total: usize| {
                total + len + if window.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&window, total) > self.chunk_size && !window.is_empty() {
                push_joined(&mut docs, &window, separator);
                while total > self.chunk_overlap
                    || (joined_len(&window, total) > self.chunk_size && total > 0)
                {
                    let Some(front) = window.pop_front() else { break };
                    total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }
        push_joined(&mut docs, &window, separator);
        docs
    }

    /// Last resort for text with no usable separator.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut out = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                out.push(chunk.to_string());
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }
        out
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(docs: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let joined = joined.trim();
    if !joined.is_empty() {
        docs.push(joined.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = RecursiveChunker::new(100, 20);
        assert_eq!(chunker.split("  Pikachu is Electric.  "), vec!["Pikachu is Electric."]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(RecursiveChunker::new(100, 20).split(" \n\n ").is_empty());
    }

    #[test]
    fn chunks_respect_size() {
        let text = "Bulbasaur is a Grass type. ".repeat(80);
        let chunker = RecursiveChunker::new(200, 40);
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 200, "chunk of {} chars", c.chars().count());
        }
    }

    #[test]
    fn prefers_section_boundaries() {
        let section = |name: &str| format!("=== {name} ===\n{}", "stat line\n".repeat(8));
        let text = format!(
            "Pokemon: Mew (#151)\n\n{}\n\n{}\n\n{}",
            section("Basic Information"),
            section("Base Stats"),
            section("Abilities")
        );
        let chunker = RecursiveChunker::new(120, 0);
        let chunks = chunker.split(&text);
        assert!(chunks.iter().any(|c| c.starts_with("Base Stats ===")));
        assert!(chunks.iter().all(|c| c.chars().count() <= 120));
    }

    #[test]
    fn neighbours_overlap() {
        let words: Vec<String> = (0..200).map(|i| format!("w{i:03}")).collect();
        let text = words.join(" ");
        let chunker = RecursiveChunker::new(100, 30);
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').next_back().unwrap();
            assert!(pair[1].contains(last_word), "{:?} / {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn no_text_is_lost_without_overlap() {
        let words: Vec<String> = (0..120).map(|i| format!("word{i}")).collect();
        let text = words.join(" ");
        let chunks = RecursiveChunker::new(64, 0).split(&text);
        let rejoined = chunks.join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn unbroken_text_is_hard_split() {
        let text = "x".repeat(250);
        let chunks = RecursiveChunker::new(100, 10).split(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn overlap_is_clamped() {
        let chunker = RecursiveChunker::new(10, 50);
        let chunks = chunker.split(&"y".repeat(35));
        assert!(!chunks.is_empty());
    }
}
