use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::io::StorageError;
use crate::model::task::Task;
use crate::parse::task_parser::parse_task;

/// Path of a sibling file (`trash`, `done`) next to the main task file.
///
/// A file named exactly `todo.txt` gets plain `trash.txt`/`done.txt`
/// siblings; any other name gets `<stem>_trash.txt`/`<stem>_done.txt`.
pub fn sibling_path(path: &Path, kind: &str) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("todo.txt");
    if name == "todo.txt" {
        dir.join(format!("{kind}.txt"))
    } else {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
        dir.join(format!("{stem}_{kind}.txt"))
    }
}

/// Read and parse a local task file.
///
/// A missing file is created empty. Unparsable lines are skipped, never
/// fatal: line numbers count parsed tasks only. Returns the tasks and the
/// file's modification time.
pub(crate) fn read_tasks(path: &Path) -> Result<(Vec<Task>, DateTime<Utc>), StorageError> {
    if !path.exists() {
        File::create(path).map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let text = fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tasks = Vec::new();
    for line in text.lines() {
        match parse_task(line) {
            Ok(mut task) => {
                task.line_number = tasks.len();
                tasks.push(task);
            }
            Err(e) => debug!(line, "skipping unparsable line: {e}"),
        }
    }

    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    Ok((tasks, DateTime::<Utc>::from(modified)))
}

/// Replace the file's contents with the given lines.
pub(crate) fn write_lines(path: &Path, lines: &[String]) -> Result<(), StorageError> {
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Append the given lines, creating the file if needed.
pub(crate) fn append_lines(path: &Path, lines: &[String]) -> Result<(), StorageError> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    for line in lines {
        writeln!(file, "{line}").map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sibling_naming_for_the_default_file() {
        assert_eq!(
            sibling_path(Path::new("/tasks/todo.txt"), "trash"),
            PathBuf::from("/tasks/trash.txt")
        );
        assert_eq!(
            sibling_path(Path::new("/tasks/todo.txt"), "done"),
            PathBuf::from("/tasks/done.txt")
        );
    }

    #[test]
    fn sibling_naming_for_other_files() {
        assert_eq!(
            sibling_path(Path::new("/tasks/work.txt"), "trash"),
            PathBuf::from("/tasks/work_trash.txt")
        );
        assert_eq!(
            sibling_path(Path::new("work.txt"), "done"),
            PathBuf::from("work_done.txt")
        );
    }

    #[test]
    fn missing_file_is_created_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("todo.txt");
        let (tasks, _) = read_tasks(&path).unwrap();
        assert!(tasks.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn unparsable_lines_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("todo.txt");
        fs::write(&path, "good task\n\nbad due:9999-99-99\nanother good one\n").unwrap();
        let (tasks, _) = read_tasks(&path).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].line_number, 0);
        assert_eq!(tasks[1].line_number, 1);
        assert_eq!(tasks[1].description, "another good one");
    }

    #[test]
    fn append_creates_and_extends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("trash.txt");
        append_lines(&path, &["first".to_string()]).unwrap();
        append_lines(&path, &["second".to_string()]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
