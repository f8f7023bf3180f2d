//! Input sanitization.
//!
//! Strips control characters, escapes markup, and normalizes whitespace in
//! user-supplied text. The output is safe to log, echo back, and later render
//! as HTML. It does nothing about LLM semantics; that is the injection
//! detector's job.
//!
//! Every step is idempotent, and so is the composition:
//! `sanitize(sanitize(x)) == sanitize(x)`.

/// Default cap on consecutive newlines.
pub const DEFAULT_MAX_NEWLINES: usize = 3;

/// Entities emitted by [`escape_markup`]. Text that already contains them is
/// left alone so escaping never double-encodes.
const ENTITIES: &[&str] = &["&amp;", "&lt;", "&gt;", "&#34;", "&#39;", "&quot;"];

/// Sanitizer with a configurable newline cap.
#[derive(Debug, Clone, Copy)]
pub struct Sanitizer {
    max_newlines: usize,
}

impl Sanitizer {
    /// `max_newlines` is clamped to at least one.
    pub fn new(max_newlines: usize) -> Self {
        Self {
            max_newlines: max_newlines.max(1),
        }
    }

    pub fn max_newlines(&self) -> usize {
        self.max_newlines
    }

    pub fn sanitize(&self, text: &str) -> String {
        let stripped = strip_control_chars(text);
        let escaped = escape_markup(stripped.trim());
        let collapsed = collapse_horizontal_ws(&escaped);
        cap_newlines(&collapsed, self.max_newlines)
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NEWLINES)
    }
}

/// Sanitize with the default newline cap.
pub fn sanitize(text: &str) -> String {
    Sanitizer::default().sanitize(text)
}

/// C0 controls and DEL, except `\t` and `\n`. `\r` is removed too, which
/// turns CRLF into LF.
fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}'..='\u{1F}' | '\u{7F}')
}

fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| !is_stripped_control(*c)).collect()
}

/// Escape `< > & " '`, leaving existing entities intact.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '&' => {
                let rest = &text[i..];
                if ENTITIES.iter().any(|e| rest.starts_with(e)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Replace every run of spaces and tabs with a single space.
fn collapse_horizontal_ws(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            in_run = false;
            out.push(c);
        }
    }
    out
}

/// Replace every run of more than `max` newlines with exactly `max`.
fn cap_newlines(text: &str, max: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= max {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }
    out
}
