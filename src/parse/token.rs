//! Hand-written token scanner for the todo.txt line grammar.
//!
//! Grammar, per whitespace-separated token:
//!   labeled  := label ':' value      where label ∈ { t, due, rec }
//!   tag      := ('+' | '@') word     where word is `[A-Za-z0-9_]+`
//!   priority := '(' letter ')'       only as the first token
//!
//! The first occurrence of each label wins; later duplicates are ignored.

/// Priority change extracted from a line or an edit spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityToken {
    /// `(A)`–`(Z)` as the leading token.
    Set(char),
    /// The literal `(x)` as the leading token (edit specs only).
    Clear,
}

/// The four independently-extracted fields shared by the line parser and the
/// edit operation: priority, threshold, due, recurrence. Values are raw token
/// text; date resolution happens later.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Changes {
    pub priority: Option<PriorityToken>,
    pub threshold: Option<String>,
    pub due: Option<String>,
    pub recurrence: Option<String>,
}

/// Scan a line (or edit spec) for the four labeled fields.
pub fn scan_changes(line: &str) -> Changes {
    let mut changes = Changes::default();

    for (i, token) in line.split_whitespace().enumerate() {
        if i == 0 {
            changes.priority = priority_token(token);
        }
        if let Some(value) = token.strip_prefix("t:") {
            if !value.is_empty() && changes.threshold.is_none() {
                changes.threshold = Some(value.to_string());
            }
        } else if let Some(value) = token.strip_prefix("due:") {
            if !value.is_empty() && changes.due.is_none() {
                changes.due = Some(value.to_string());
            }
        } else if let Some(value) = token.strip_prefix("rec:") {
            if !value.is_empty() && changes.recurrence.is_none() {
                changes.recurrence = Some(value.to_string());
            }
        }
    }

    changes
}

fn priority_token(token: &str) -> Option<PriorityToken> {
    let inner = token.strip_prefix('(')?.strip_suffix(')')?;
    let mut chars = inner.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    if c.is_ascii_uppercase() {
        Some(PriorityToken::Set(c))
    } else if c == 'x' {
        Some(PriorityToken::Clear)
    } else {
        None
    }
}

/// Collect `+project` and `@context` tags from a description. Tags stay
/// inline in the text; this only harvests them for indexing.
pub fn scan_tags(description: &str) -> (Vec<String>, Vec<String>) {
    let mut projects = Vec::new();
    let mut contexts = Vec::new();
    for token in description.split_whitespace() {
        if let Some(rest) = token.strip_prefix('+') {
            if let Some(word) = leading_word(rest) {
                projects.push(word);
            }
        } else if let Some(rest) = token.strip_prefix('@') {
            if let Some(word) = leading_word(rest) {
                contexts.push(word);
            }
        }
    }
    (projects, contexts)
}

fn leading_word(s: &str) -> Option<String> {
    let word: String = s
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if word.is_empty() { None } else { Some(word) }
}

/// Remove every `<label>:<value>` token from `text`, collapsing the space it
/// occupied. Used when an edit clears a field.
pub fn remove_labeled(text: &str, label: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let prefix = format!("{label}:");
    for token in text.split_whitespace() {
        if token.strip_prefix(prefix.as_str()).is_some_and(|v| !v.is_empty()) {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}
