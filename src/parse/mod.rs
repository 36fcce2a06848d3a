pub mod date;
pub mod recurrence;
pub mod task_parser;
pub mod token;

pub use date::{resolve, ymd};
pub use recurrence::parse_recurrence;
pub use task_parser::parse_task;
pub use token::{scan_changes, scan_tags, Changes};

/// Error type for line parsing
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("empty task line")]
    EmptyLine,
    #[error("invalid date {token:?}: {source}")]
    BadDate {
        token: String,
        source: chrono::ParseError,
    },
    #[error("unrecognized date token {0:?}")]
    UnknownDate(String),
}
