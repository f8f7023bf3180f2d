//! Prompt assembly under a token budget.
//!
//! Packs five fragments into one prompt string:
//!
//! 1. **Preamble** (role description): always included
//! 2. **Question**: always included
//! 3. **Instructions** (answer directives): always included
//! 4. **History**: newest turns first, whole turns only
//! 5. **Context** (retrieved passages): whatever budget remains, clipped
//!    to the longest character prefix that fits
//!
//! The list above is the order in which budget is granted. The rendered
//! order is preamble → context → history → question → instructions.
//!
//! # Budget accounting
//!
//! Every fragment ends with its own blank line, so the prompt is a plain
//! concatenation. The assembler charges each fragment separately; for the
//! character-ratio estimator `ceil((a+b)/4) <= ceil(a/4) + ceil(b/4)`, so
//! the sum it tracks is an upper bound on the cost of the final string.
//!
//! Assembly never fails. If the fixed fragments alone exceed the budget,
//! history and context are dropped and the overflow is reported in
//! [`AssemblyMetadata::fixed_overflow`].

use crate::context::token::TokenEstimator;
use pokerag_core::message::ConversationTurn;
use pokerag_core::store::RetrievedPassage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

// ── Types ─────────────────────────────────────────────────────────────────

pub const CONTEXT_HEADER: &str = "Context Information:\n\n";
pub const CONTEXT_HEADER_TRUNCATED: &str = "Context Information (truncated):\n\n";
pub const CONTEXT_TRUNCATION_MARKER: &str = "\n[... context truncated to fit the prompt budget ...]\n\n";
pub const HISTORY_HEADER: &str = "=== Recent Conversation ===\n";
pub const HISTORY_HEADER_TRUNCATED: &str =
    "=== Recent Conversation (truncated: earlier turns omitted) ===\n";
const HISTORY_FOOTER: &str = "\n";

/// Fixed wording around the dynamic parts of the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub preamble: String,
    pub instructions: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            preamble: "You are a helpful Pokemon expert assistant. Answer questions based on \
                       the provided context about Pokemon."
                .into(),
            instructions: "Instructions:\n\
                - Answer based on the context above and conversation history\n\
                - Use conversation context to understand references (it, that Pokemon, etc.)\n\
                - Be specific and accurate about Pokemon stats, types, and abilities\n\
                - If comparing Pokemon, use specific numbers when available\n\
                - If the context doesn't contain the information, say so clearly\n\
                - Keep your answer concise but informative\n\n\
                Answer:"
                .into(),
        }
    }
}

/// Token budget for a whole prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBudget {
    pub max_total_tokens: usize,
}

impl PromptBudget {
    pub fn new(max_total_tokens: usize) -> Self {
        Self { max_total_tokens }
    }
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self::new(4000)
    }
}

/// The assembled prompt, one immutable fragment per section.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system_preamble: String,
    pub context_block: String,
    pub history_block: String,
    pub question_block: String,
    pub instructions_block: String,
    pub metadata: AssemblyMetadata,
}

impl AssembledPrompt {
    /// The final prompt string, in render order.
    pub fn render(&self) -> String {
        [
            self.system_preamble.as_str(),
            self.context_block.as_str(),
            self.history_block.as_str(),
            self.question_block.as_str(),
            self.instructions_block.as_str(),
        ]
        .concat()
    }
}

impl std::fmt::Display for AssembledPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// What the assembler kept and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Configured token budget.
    pub budget: usize,
    /// Sum of the per-fragment estimates.
    pub total_tokens: usize,
    /// Budget utilization percentage.
    pub utilization_pct: f32,
    pub turns_total: usize,
    pub turns_kept: usize,
    pub history_truncated: bool,
    pub context_chars_total: usize,
    pub context_chars_kept: usize,
    pub context_truncated: bool,
    /// Preamble, question and instructions alone exceed the budget.
    pub fixed_overflow: bool,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// Stateless apart from the template and estimator. Create one and share it.
pub struct PromptAssembler {
    template: PromptTemplate,
    estimator: Arc<TokenEstimator>,
}

impl PromptAssembler {
    pub fn new(template: PromptTemplate, estimator: Arc<TokenEstimator>) -> Self {
        Self { template, estimator }
    }

    pub fn with_default_template(estimator: Arc<TokenEstimator>) -> Self {
        Self::new(PromptTemplate::default(), estimator)
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    pub fn assemble(
        &self,
        passages: &[RetrievedPassage],
        question: &str,
        history: &[ConversationTurn],
        budget: PromptBudget,
    ) -> AssembledPrompt {
        let system_preamble = format!("{}\n\n", self.template.preamble);
        let question_block = format!("Current Question: {question}\n\n");
        let instructions_block = self.template.instructions.clone();

        let fixed = self.cost(&system_preamble) + self.cost(&question_block) + self.cost(&instructions_block);
        let fixed_overflow = fixed > budget.max_total_tokens;
        let mut remaining = budget.max_total_tokens.saturating_sub(fixed);

        let history_part = self.render_history(history, remaining);
        remaining -= history_part.tokens;

        let context_body = render_passages(passages);
        let context_part = self.render_context(&context_body, remaining);

        let total_tokens = fixed + history_part.tokens + context_part.tokens;
        let utilization_pct = if budget.max_total_tokens == 0 {
            100.0
        } else {
            (total_tokens as f32 / budget.max_total_tokens as f32) * 100.0
        };

        let metadata = AssemblyMetadata {
            budget: budget.max_total_tokens,
            total_tokens,
            utilization_pct,
            turns_total: history.len(),
            turns_kept: history_part.kept,
            history_truncated: history_part.kept < history.len(),
            context_chars_total: context_body.chars().count(),
            context_chars_kept: context_part.chars_kept,
            context_truncated: context_part.truncated,
            fixed_overflow,
        };

        debug!(
            budget = metadata.budget,
            total_tokens,
            fixed_tokens = fixed,
            history_tokens = history_part.tokens,
            context_tokens = context_part.tokens,
            turns_kept = metadata.turns_kept,
            turns_total = metadata.turns_total,
            context_truncated = metadata.context_truncated,
            "Assembled prompt"
        );

        AssembledPrompt {
            system_preamble,
            context_block: context_part.block,
            history_block: history_part.block,
            question_block,
            instructions_block,
            metadata,
        }
    }

    fn cost(&self, text: &str) -> usize {
        self.estimator.estimate(text)
    }

    // ── Private fragment renderers ────────────────────────────────────────

    /// Select whole turns, newest first, while they fit in `budget`.
    ///
    /// Turns are first chosen against the plain header. When some turn is
    /// left out the truncated header applies instead, and the oldest kept
    /// turns are released until the block fits under it.
    fn render_history(&self, history: &[ConversationTurn], budget: usize) -> HistoryPart {
        if history.is_empty() {
            return HistoryPart::empty();
        }

        let footer = self.cost(HISTORY_FOOTER);
        let plain_overhead = self.cost(HISTORY_HEADER) + footer;
        if plain_overhead > budget {
            return HistoryPart::empty();
        }

        let mut used = plain_overhead;
        let mut lines: Vec<(String, usize)> = Vec::new();
        for turn in history.iter().rev() {
            let line = format!("{}: {}\n", turn.role().speaker_label(), turn.content());
            let line_tokens = self.cost(&line);
            if used + line_tokens > budget {
                break;
            }
            used += line_tokens;
            lines.push((line, line_tokens));
        }

        let header = if lines.len() == history.len() {
            HISTORY_HEADER
        } else {
            used = used - plain_overhead + self.cost(HISTORY_HEADER_TRUNCATED) + footer;
            while used > budget {
                let Some((_, tokens)) = lines.pop() else { break };
                used -= tokens;
            }
            HISTORY_HEADER_TRUNCATED
        };

        if lines.is_empty() {
            return HistoryPart::empty();
        }

        lines.reverse();
        let body: String = lines.iter().map(|(line, _)| line.as_str()).collect();
        HistoryPart {
            block: format!("{header}{body}{HISTORY_FOOTER}"),
            tokens: used,
            kept: lines.len(),
        }
    }

    /// Fit the rendered passages into `budget`, clipping if needed.
    fn render_context(&self, body: &str, budget: usize) -> ContextPart {
        if body.is_empty() {
            return ContextPart::empty(false);
        }

        let full_tokens = self.cost(CONTEXT_HEADER) + self.cost(body);
        if full_tokens <= budget {
            return ContextPart {
                block: format!("{CONTEXT_HEADER}{body}"),
                tokens: full_tokens,
                chars_kept: body.chars().count(),
                truncated: false,
            };
        }

        let overhead = self.cost(CONTEXT_HEADER_TRUNCATED) + self.cost(CONTEXT_TRUNCATION_MARKER);
        let Some(target) = budget.checked_sub(overhead).filter(|t| *t > 0) else {
            return ContextPart::empty(true);
        };

        let (prefix, chars_kept) = longest_prefix_within(body, target, |s| self.cost(s));
        if chars_kept == 0 {
            return ContextPart::empty(true);
        }

        ContextPart {
            block: format!("{CONTEXT_HEADER_TRUNCATED}{prefix}{CONTEXT_TRUNCATION_MARKER}"),
            tokens: overhead + self.cost(prefix),
            chars_kept,
            truncated: true,
        }
    }
}

struct HistoryPart {
    block: String,
    tokens: usize,
    kept: usize,
}

impl HistoryPart {
    fn empty() -> Self {
        Self {
            block: String::new(),
            tokens: 0,
            kept: 0,
        }
    }
}

struct ContextPart {
    block: String,
    tokens: usize,
    chars_kept: usize,
    truncated: bool,
}

impl ContextPart {
    fn empty(truncated: bool) -> Self {
        Self {
            block: String::new(),
            tokens: 0,
            chars_kept: 0,
            truncated,
        }
    }
}

/// `[i] content` lines, numbered from 1, each followed by a blank line.
pub fn render_passages(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] {}\n\n", i + 1, p.content))
        .collect()
}

/// Largest character prefix of `text` whose cost is at most `target`.
///
/// Binary search over char boundaries; converges exactly for a monotonic
/// cost function in at most `ceil(log2(n + 1))` probes. Returns the prefix
/// and its length in characters.
pub fn longest_prefix_within(
    text: &str,
    target: usize,
    cost: impl Fn(&str) -> usize,
) -> (&str, usize) {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    // Invariant: prefix of `lo` chars fits, prefix of `hi + 1` does not.
    let mut lo = 0;
    let mut hi = boundaries.len() - 1;
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if cost(&text[..boundaries[mid]]) <= target {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    (&text[..boundaries[lo]], lo)
}
