use serde::Serialize;

use crate::model::file::TaskFile;
use crate::model::task::Task;

/// One task in a structured export: all parsed fields plus the exact
/// original text.
#[derive(Serialize)]
pub struct TaskRecord<'a> {
    #[serde(flatten)]
    task: &'a Task,
    original: &'a str,
}

/// A renderable snapshot of a task file: the active sort order and
/// future-visibility flag, the visible task count, and the visible tasks.
/// Tasks flagged as filtered-out are excluded.
#[derive(Serialize)]
pub struct TaskFileView<'a> {
    pub sort_order: &'a str,
    pub show_future: bool,
    pub task_count: usize,
    pub tasks: Vec<TaskRecord<'a>>,
}

/// Build an export view of the file's current presentation order.
pub fn view(tf: &TaskFile) -> TaskFileView<'_> {
    let tasks: Vec<TaskRecord<'_>> = tf
        .tasks
        .iter()
        .filter(|t| !t.filtered_out)
        .map(|t| TaskRecord {
            task: t,
            original: t.original(),
        })
        .collect();
    TaskFileView {
        sort_order: &tf.opts.sort_order,
        show_future: tf.opts.show_future,
        task_count: tasks.len(),
        tasks,
    }
}

pub fn to_json(tf: &TaskFile) -> serde_json::Result<String> {
    serde_json::to_string(&view(tf))
}
