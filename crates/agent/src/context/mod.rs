//! Prompt context: token estimation and budgeted prompt assembly.
//!
//! The assembled prompt is made of five fragments, in order:
//!
//! | Fragment | Source | Trim strategy |
//! |----------|--------|---------------|
//! | Preamble | Template | Never trimmed |
//! | Context | Retrieved passages | Cut at the longest prefix that fits |
//! | History | Recent turns | Oldest turns dropped first |
//! | Question | Current message | Never trimmed |
//! | Instructions | Template | Never trimmed |

pub mod assembler;
pub mod token;

pub use assembler::{
    AssembledPrompt, AssemblyMetadata, PromptAssembler, PromptBudget, PromptTemplate,
};
pub use token::{estimate_tokens, TokenEstimator};
