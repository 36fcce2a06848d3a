//! A todo.txt task-file engine.
//!
//! Parses task lines into structured [`model::Task`]s while preserving their
//! exact textual form for lossless rewriting, mutates them through the ops
//! layer (add, edit, toggle, delete, archive, replace), applies a
//! deterministic multi-key sort and a threshold filter for presentation, and
//! syncs with either the local filesystem or a WebDAV remote, watching for
//! external changes. CLI parsing, rendering, and logging setup are left to
//! the embedding application.

pub mod export;
pub mod io;
pub mod model;
pub mod ops;
pub mod parse;

pub use io::{BackendConfig, Storage, StorageError, WebdavConfig};
pub use model::{FileChangedEvent, LoadOpts, Priority, Recurrence, Task, TaskFile, DEFAULT_SORT_ORDER};
pub use parse::{parse_task, ParseError};
