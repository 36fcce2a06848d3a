use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// Task priority: a letter `A`–`Z`, or none.
///
/// The derived ordering puts `Letter` before `None`, so priority-less
/// tasks always sort after prioritized ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Letter(char),
    None,
}

impl Priority {
    pub fn is_none(self) -> bool {
        self == Priority::None
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Letter(c) => write!(f, "{c}"),
            Priority::None => write!(f, "none"),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Recurrence period unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "w")]
    Week,
    #[serde(rename = "m")]
    Month,
    #[serde(rename = "y")]
    Year,
}

impl Period {
    pub fn from_char(c: char) -> Option<Period> {
        match c {
            'd' => Some(Period::Day),
            'w' => Some(Period::Week),
            'm' => Some(Period::Month),
            'y' => Some(Period::Year),
            _ => None,
        }
    }
}

/// A recurrence rule: `[+]<n><unit>`, e.g. `1w` or `+3d`.
///
/// `strict` (the `+` prefix) means the next occurrence is offset from the
/// original date; non-strict recurrence counts forward from today instead.
/// `raw` keeps the token exactly as written, for text rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recurrence {
    pub period: Period,
    pub every: u32,
    pub strict: bool,
    #[serde(rename = "string")]
    pub raw: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One line of a todo.txt file.
///
/// The structured fields are derived from `original`, which holds the exact
/// source line and is rewritten in place by every mutation so the on-disk
/// format (spacing, tag order) survives edits. Re-parsing `original` must
/// reproduce the same structured fields.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    #[serde(skip_serializing_if = "is_false")]
    pub done: bool,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDate>,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    #[serde(skip_serializing_if = "is_false")]
    pub has_due: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub overdue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<NaiveDate>,
    #[serde(skip_serializing_if = "is_false")]
    pub has_threshold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// Exact source line. Private: mutations go through the ops layer so the
    /// structured fields stay consistent with the text.
    #[serde(skip)]
    original: String,
    pub line_number: usize,
    /// Mutation marker, never persisted.
    #[serde(skip)]
    pub deleted: bool,
    /// View marker, never persisted.
    #[serde(skip)]
    pub filtered_out: bool,
}

impl Task {
    /// Create an empty task carrying the given source line.
    pub(crate) fn from_line(line: &str) -> Task {
        Task {
            done: false,
            priority: Priority::None,
            completed: None,
            created: None,
            description: String::new(),
            projects: Vec::new(),
            contexts: Vec::new(),
            due: None,
            has_due: false,
            overdue: false,
            threshold: None,
            has_threshold: false,
            recurrence: None,
            original: line.to_string(),
            line_number: 0,
            deleted: false,
            filtered_out: false,
        }
    }

    /// The exact text of this task as it will be written to disk.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub(crate) fn set_original(&mut self, text: String) {
        self.original = text;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_letters_sort_before_none() {
        assert!(Priority::Letter('A') < Priority::Letter('B'));
        assert!(Priority::Letter('Z') < Priority::None);
    }

    #[test]
    fn priority_serializes_as_string() {
        assert_eq!(
            serde_json::to_string(&Priority::Letter('A')).unwrap(),
            "\"A\""
        );
        assert_eq!(serde_json::to_string(&Priority::None).unwrap(), "\"none\"");
    }
}
