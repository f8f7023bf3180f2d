//! Input safety: sanitization, injection heuristics, conversation limits.

pub mod injection;
pub mod sanitize;
pub mod validator;

pub use injection::is_suspicious;
pub use sanitize::{sanitize, Sanitizer};
pub use validator::{ConversationValidator, ValidatedChat, ValidationLimits};
