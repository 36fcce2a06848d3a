use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};

use crate::io::watcher::WatcherHandle;
use crate::model::task::Task;

/// Default multi-key sort order applied when the caller gives none.
pub const DEFAULT_SORT_ORDER: &str = "done,priority,due-,threshold-";

/// Per-file load options: presentation sort order and whether tasks with a
/// future threshold date are shown.
#[derive(Debug, Clone)]
pub struct LoadOpts {
    pub show_future: bool,
    pub sort_order: String,
}

impl Default for LoadOpts {
    fn default() -> Self {
        LoadOpts {
            show_future: false,
            sort_order: DEFAULT_SORT_ORDER.to_string(),
        }
    }
}

/// A single "the backing file changed" notification. The kind string is
/// opaque; consumers are expected to fully reload on receipt.
#[derive(Debug, Clone)]
pub struct FileChangedEvent {
    pub kind: String,
}

/// An ordered collection of tasks backed by one todo.txt file.
///
/// Created by a load operation, mutated in place by the ops layer (each
/// operation returns `&mut Self` for chaining), and serialized back by the
/// storage layer. A watching `TaskFile` owns its background watcher; dropping
/// the file (or calling [`TaskFile::stop_watch`]) signals the watcher to stop
/// and joins it.
#[derive(Debug)]
pub struct TaskFile {
    pub path: PathBuf,
    pub opts: LoadOpts,
    pub tasks: Vec<Task>,
    /// Modification time of the backing file as of the last load.
    pub last_update: DateTime<Utc>,
    events: Option<Receiver<FileChangedEvent>>,
    watcher: Option<WatcherHandle>,
}

impl TaskFile {
    pub fn new(path: PathBuf, opts: LoadOpts) -> TaskFile {
        TaskFile {
            path,
            opts,
            tasks: Vec::new(),
            last_update: Utc::now(),
            events: None,
            watcher: None,
        }
    }

    /// Index of the task with the given line number, if present.
    pub(crate) fn find_task(&self, line_number: usize) -> Option<usize> {
        self.tasks.iter().position(|t| t.line_number == line_number)
    }

    /// The raw text of the task with the given id, if present.
    pub fn original(&self, line_number: usize) -> Option<&str> {
        self.find_task(line_number)
            .map(|i| self.tasks[i].original())
    }

    /// Non-blocking check for a pending change notification.
    pub fn poll_change(&self) -> Option<FileChangedEvent> {
        match self.events.as_ref()?.try_recv() {
            Ok(ev) => Some(ev),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the backing file changes or the watcher exits.
    pub fn wait_change(&self) -> Option<FileChangedEvent> {
        self.events.as_ref()?.recv().ok()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub(crate) fn attach_watch(&mut self, events: Receiver<FileChangedEvent>, handle: WatcherHandle) {
        // Replacing the handle drops any previous watcher, which stops and
        // joins its thread before the new one takes over.
        self.events = Some(events);
        self.watcher = Some(handle);
    }

    /// Stop the background watcher, if any, and wait for it to exit.
    pub fn stop_watch(&mut self) {
        if let Some(handle) = self.watcher.take() {
            handle.stop();
        }
        self.events = None;
    }
}
