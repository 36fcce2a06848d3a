use chrono::NaiveDate;
use tracing::warn;

use crate::io::local::sibling_path;
use crate::io::{Storage, StorageError};
use crate::model::file::TaskFile;
use crate::model::task::{Priority, Task};
use crate::parse::date::{looks_like_date, resolve, today, ymd};
use crate::parse::recurrence::parse_recurrence;
use crate::parse::task_parser::{parse_task, parse_task_at};
use crate::parse::token::{remove_labeled, scan_changes, PriorityToken};

// ---------------------------------------------------------------------------
// Task store mutations
//
// All operations locate tasks by line number and silently no-op on unknown
// ids. Each rewrites the task's original text alongside the structured
// fields, so the on-disk format survives.
// ---------------------------------------------------------------------------

impl TaskFile {
    /// Parse `line` as a new task, stamp today as its creation date, rewrite
    /// its text to the standard `[(P) ]<date> <rest>` form, and append it.
    /// An unparsable line is ignored.
    pub fn add(&mut self, line: &str) -> &mut Self {
        self.add_at(line, today())
    }

    pub(crate) fn add_at(&mut self, line: &str, today: NaiveDate) -> &mut Self {
        let Ok(mut task) = parse_task_at(line, today) else {
            return self;
        };
        task.created = Some(today);
        let text = match task.priority {
            Priority::None => format!("{} {}", ymd(today), task.original().trim()),
            Priority::Letter(c) => {
                let rest = task
                    .original()
                    .split_whitespace()
                    .skip(1)
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("({c}) {} {rest}", ymd(today))
            }
        };
        task.set_original(text);
        task.line_number = self.tasks.len();
        self.tasks.push(task);
        self
    }

    /// Apply an edit spec to each task in `ids` independently.
    ///
    /// `changes` carries up to four space-joined tokens, parsed with the same
    /// extraction as the line parser: `(P)` priority (`(x)` clears),
    /// `t:<value>`, `due:<value>`, `rec:<rule>`. The value `x` clears a field.
    /// Without `force`, a due/threshold is only shifted if already present,
    /// never added. Done tasks are skipped.
    pub fn edit(&mut self, changes: &str, force: bool, ids: &[usize]) -> &mut Self {
        let c = scan_changes(changes);
        self.set_priorities(c.priority, ids);
        self.set_thresholds(c.threshold.as_deref(), force, ids);
        self.set_due_dates(c.due.as_deref(), force, ids);
        self.set_recurrence(c.recurrence.as_deref(), ids);
        self
    }

    /// Flip completion state for each id.
    ///
    /// Completing a task with a recurrence rule first appends its next
    /// occurrence (see [`Task::recurring_next`]). Un-doing stops after the
    /// first done id in the list.
    pub fn toggle(&mut self, ids: &[usize]) -> &mut Self {
        for &id in ids {
            let Some(i) = self.find_task(id) else { continue };
            if self.tasks[i].done {
                self.untoggle_at(i);
                // Historical behavior: only the first done id in the list is
                // ever un-done, the rest are left as they are.
                break;
            }
            self.complete_at(i);
        }
        self
    }

    /// Re-parse `text` and substitute it for the task at `id`. A no-op on
    /// empty input, unknown ids, unparsable text, and done tasks.
    pub fn replace(&mut self, text: &str, id: usize) -> &mut Self {
        if text.trim().is_empty() {
            return self;
        }
        let Some(i) = self.find_task(id) else {
            return self;
        };
        if self.tasks[i].done {
            return self;
        }
        let Ok(mut task) = parse_task(text) else {
            return self;
        };
        task.line_number = self.tasks[i].line_number;
        self.tasks[i] = task;
        self
    }

    /// Remove the tasks in `ids` from the active list and append their
    /// original lines to the trash sibling file.
    pub fn delete(&mut self, storage: &Storage, ids: &[usize]) -> Result<&mut Self, StorageError> {
        for &id in ids {
            if let Some(i) = self.find_task(id) {
                self.tasks[i].deleted = true;
            }
        }
        let (trash, keep): (Vec<Task>, Vec<Task>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|t| t.deleted);
        self.tasks = keep;
        let lines: Vec<String> = trash.iter().map(|t| t.original().to_string()).collect();
        storage.append(&sibling_path(&self.path, "trash"), &lines)?;
        Ok(self)
    }

    /// Move all done tasks out of the file, appending their original lines to
    /// the done sibling file.
    pub fn archive(&mut self, storage: &Storage) -> Result<&mut Self, StorageError> {
        let (done, pending): (Vec<Task>, Vec<Task>) =
            std::mem::take(&mut self.tasks).into_iter().partition(Task::is_done);
        self.tasks = pending;
        let lines: Vec<String> = done.iter().map(|t| t.original().to_string()).collect();
        storage.append(&sibling_path(&self.path, "done"), &lines)?;
        Ok(self)
    }

    // -- completion internals ----------------------------------------------

    fn complete_at(&mut self, i: usize) {
        let now = today();
        if self.tasks[i].recurrence.is_some() {
            let mut next = self.tasks[i].recurring_next(now);
            next.line_number = self.tasks.len();
            self.tasks.push(next);
        }
        let t = &mut self.tasks[i];
        t.completed = Some(now);
        t.done = true;
        t.overdue = false;
        let text = format!("x {} {}", ymd(now), t.original());
        t.set_original(text);
    }

    fn untoggle_at(&mut self, i: usize) {
        let t = &mut self.tasks[i];
        let rest = t
            .original()
            .split_whitespace()
            .skip(2)
            .collect::<Vec<_>>()
            .join(" ");
        t.set_original(rest);
        t.done = false;
        t.completed = None;
        t.overdue = t.due.is_some_and(|d| d < today());
    }

    // -- field setters ------------------------------------------------------

    fn set_priorities(&mut self, pri: Option<PriorityToken>, ids: &[usize]) {
        let Some(pri) = pri else { return };
        for &id in ids {
            let Some(i) = self.find_task(id) else { continue };
            let t = &mut self.tasks[i];
            if t.done {
                continue;
            }
            match pri {
                PriorityToken::Clear => {
                    if let Some(rest) = strip_priority_prefix(t.original()) {
                        t.set_original(rest);
                    }
                    t.priority = Priority::None;
                }
                PriorityToken::Set(c) => {
                    let text = if t.priority.is_none() {
                        format!("({c}) {}", t.original())
                    } else {
                        let rest = t
                            .original()
                            .split_whitespace()
                            .skip(1)
                            .collect::<Vec<_>>()
                            .join(" ");
                        format!("({c}) {rest}")
                    };
                    t.set_original(text);
                    t.priority = Priority::Letter(c);
                }
            }
        }
    }

    fn set_thresholds(&mut self, value: Option<&str>, force: bool, ids: &[usize]) {
        let Some(value) = value else { return };
        let value = value.to_ascii_lowercase();
        for &id in ids {
            let Some(i) = self.find_task(id) else { continue };
            let t = &mut self.tasks[i];
            if t.done {
                continue;
            }
            if value == "x" {
                let text = remove_labeled(t.original(), "t");
                t.set_original(text);
                t.threshold = None;
                t.has_threshold = false;
            } else if let Some(cur) = t.threshold {
                match resolve(&value, cur) {
                    Ok(d) => {
                        let text = t
                            .original()
                            .replace(&format!("t:{}", ymd(cur)), &format!("t:{}", ymd(d)));
                        t.set_original(text);
                        t.threshold = Some(d);
                    }
                    Err(e) => warn!(id, value = %value, "ignoring threshold edit: {e}"),
                }
            } else if force {
                match resolve(&value, today()) {
                    Ok(d) => {
                        let text = format!("{} t:{}", t.original(), ymd(d));
                        t.set_original(text);
                        t.threshold = Some(d);
                        t.has_threshold = true;
                    }
                    Err(e) => warn!(id, value = %value, "ignoring threshold edit: {e}"),
                }
            }
        }
    }

    fn set_due_dates(&mut self, value: Option<&str>, force: bool, ids: &[usize]) {
        let Some(value) = value else { return };
        let value = value.to_ascii_lowercase();
        for &id in ids {
            let Some(i) = self.find_task(id) else { continue };
            let t = &mut self.tasks[i];
            if t.done {
                continue;
            }
            if value == "x" {
                let text = remove_labeled(t.original(), "due");
                t.set_original(text);
                t.due = None;
                t.has_due = false;
                t.overdue = false;
            } else if let Some(cur) = t.due {
                match resolve(&value, cur) {
                    Ok(d) => {
                        let text = t
                            .original()
                            .replace(&format!("due:{}", ymd(cur)), &format!("due:{}", ymd(d)));
                        t.set_original(text);
                        t.due = Some(d);
                        t.overdue = d < today();
                    }
                    Err(e) => warn!(id, value = %value, "ignoring due edit: {e}"),
                }
            } else if force {
                match resolve(&value, today()) {
                    Ok(d) => {
                        let text = format!("{} due:{}", t.original(), ymd(d));
                        t.set_original(text);
                        t.due = Some(d);
                        t.has_due = true;
                        t.overdue = d < today();
                    }
                    Err(e) => warn!(id, value = %value, "ignoring due edit: {e}"),
                }
            }
        }
    }

    fn set_recurrence(&mut self, value: Option<&str>, ids: &[usize]) {
        let Some(value) = value else { return };
        let value = value.to_ascii_lowercase();
        for &id in ids {
            let Some(i) = self.find_task(id) else { continue };
            let t = &mut self.tasks[i];
            if t.done {
                continue;
            }
            if value == "x" {
                let text = remove_labeled(t.original(), "rec");
                t.set_original(text);
                t.recurrence = None;
                continue;
            }
            // Recurrence without a date to recur from is pointless.
            if !t.has_due && !t.has_threshold {
                continue;
            }
            let Some(rec) = parse_recurrence(&value) else {
                warn!(id, value = %value, "ignoring invalid recurrence edit");
                continue;
            };
            let text = match &t.recurrence {
                Some(old) => t
                    .original()
                    .replace(&format!("rec:{}", old.raw), &format!("rec:{}", rec.raw)),
                None => format!("{} rec:{}", t.original(), rec.raw),
            };
            t.set_original(text);
            t.recurrence = Some(rec);
        }
    }
}

impl Task {
    /// Value-copy constructor for the next occurrence of a recurring task:
    /// the same text with a fresh creation date and due/threshold advanced by
    /// the recurrence rule.
    pub fn recurring_next(&self, today: NaiveDate) -> Task {
        let mut next = self.clone();

        let mut parts: Vec<&str> = self.original().split_whitespace().collect();
        if !self.priority.is_none() && !parts.is_empty() {
            parts.remove(0);
        }
        if self.created.is_some() && parts.first().is_some_and(|p| looks_like_date(p)) {
            parts.remove(0);
        }
        let rest = parts.join(" ");
        let text = match self.priority {
            Priority::Letter(c) => format!("({c}) {} {rest}", ymd(today)),
            Priority::None => format!("{} {rest}", ymd(today)),
        };
        next.set_original(text);

        if let (Some(rec), Some(due)) = (&self.recurrence, self.due) {
            let d = rec.next_from(due, today);
            let text = next
                .original()
                .replace(&format!(" due:{}", ymd(due)), &format!(" due:{}", ymd(d)));
            next.set_original(text);
            next.due = Some(d);
            next.overdue = d < today;
        }
        if let (Some(rec), Some(th)) = (&self.recurrence, self.threshold) {
            let d = rec.next_from(th, today);
            let text = next
                .original()
                .replace(&format!(" t:{}", ymd(th)), &format!(" t:{}", ymd(d)));
            next.set_original(text);
            next.threshold = Some(d);
        }

        next.created = Some(today);
        next.done = false;
        next.completed = None;
        next
    }
}

fn strip_priority_prefix(text: &str) -> Option<String> {
    let b = text.as_bytes();
    if b.len() >= 4
        && b[0] == b'('
        && b[1].is_ascii_uppercase()
        && b[2] == b')'
        && b[3] == b' '
    {
        Some(text[4..].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::file::LoadOpts;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn file_with(lines: &[&str]) -> TaskFile {
        let mut tf = TaskFile::new(PathBuf::from("todo.txt"), LoadOpts::default());
        for (i, line) in lines.iter().enumerate() {
            let mut t = parse_task_at(line, d("2023-01-03")).unwrap();
            t.line_number = i;
            tf.tasks.push(t);
        }
        tf
    }

    #[test]
    fn add_stamps_creation_date_in_standard_form() {
        let mut tf = file_with(&[]);
        tf.add_at("(B) call the bank @phone", d("2023-01-03"));
        let t = &tf.tasks[0];
        assert_eq!(t.original(), "(B) 2023-01-03 call the bank @phone");
        assert_eq!(t.created, Some(d("2023-01-03")));
        assert_eq!(t.line_number, 0);

        let mut tf = file_with(&["first task"]);
        tf.add_at("plain task", d("2023-01-03"));
        assert_eq!(tf.tasks[1].original(), "2023-01-03 plain task");
        assert_eq!(tf.tasks[1].line_number, 1);
    }

    #[test]
    fn add_ignores_unparsable_lines() {
        let mut tf = file_with(&[]);
        tf.add("   ");
        assert!(tf.tasks.is_empty());
    }

    #[test]
    fn edit_shifts_existing_due_date() {
        let mut tf = file_with(&["pay rent due:2023-02-01"]);
        tf.edit("due:+3d", false, &[0]);
        let t = &tf.tasks[0];
        assert_eq!(t.due, Some(d("2023-02-04")));
        assert_eq!(t.original(), "pay rent due:2023-02-04");
    }

    #[test]
    fn edit_without_force_never_adds_a_date() {
        let mut tf = file_with(&["water plants"]);
        tf.edit("due:3d", false, &[0]);
        assert!(tf.tasks[0].due.is_none());
        assert_eq!(tf.tasks[0].original(), "water plants");
    }

    #[test]
    fn edit_with_force_adds_a_date() {
        let mut tf = file_with(&["water plants"]);
        tf.edit("due:2023-04-01", true, &[0]);
        assert_eq!(tf.tasks[0].due, Some(d("2023-04-01")));
        assert_eq!(tf.tasks[0].original(), "water plants due:2023-04-01");
    }

    #[test]
    fn edit_x_clears_regardless_of_force() {
        let mut tf = file_with(&["pay rent due:2023-02-01 t:2023-01-15"]);
        tf.edit("due:x t:x", false, &[0]);
        let t = &tf.tasks[0];
        assert!(t.due.is_none());
        assert!(!t.has_due);
        assert!(t.threshold.is_none());
        assert_eq!(t.original(), "pay rent");
    }

    #[test]
    fn edit_sets_and_clears_priority() {
        let mut tf = file_with(&["fix the gate"]);
        tf.edit("(A)", false, &[0]);
        assert_eq!(tf.tasks[0].priority, Priority::Letter('A'));
        assert_eq!(tf.tasks[0].original(), "(A) fix the gate");

        tf.edit("(B)", false, &[0]);
        assert_eq!(tf.tasks[0].original(), "(B) fix the gate");

        tf.edit("(x)", false, &[0]);
        assert_eq!(tf.tasks[0].priority, Priority::None);
        assert_eq!(tf.tasks[0].original(), "fix the gate");
    }

    #[test]
    fn edit_skips_done_tasks() {
        let mut tf = file_with(&["x 2023-01-02 shipped thing due:2023-02-01"]);
        tf.edit("due:+1w", false, &[0]);
        assert_eq!(tf.tasks[0].due, Some(d("2023-02-01")));
    }

    #[test]
    fn edit_recurrence_requires_a_date() {
        let mut tf = file_with(&["no dates here"]);
        tf.edit("rec:1w", false, &[0]);
        assert!(tf.tasks[0].recurrence.is_none());

        let mut tf = file_with(&["water plants due:2023-02-01"]);
        tf.edit("rec:1w", false, &[0]);
        assert_eq!(tf.tasks[0].recurrence.as_ref().unwrap().raw, "1w");
        assert_eq!(tf.tasks[0].original(), "water plants due:2023-02-01 rec:1w");
    }

    #[test]
    fn edit_replaces_existing_recurrence_token() {
        let mut tf = file_with(&["water plants due:2023-02-01 rec:1w"]);
        tf.edit("rec:+2d", false, &[0]);
        assert_eq!(tf.tasks[0].original(), "water plants due:2023-02-01 rec:+2d");
        assert!(tf.tasks[0].recurrence.as_ref().unwrap().strict);
    }

    #[test]
    fn edit_unknown_id_is_a_noop() {
        let mut tf = file_with(&["only task due:2023-02-01"]);
        tf.edit("due:x", false, &[99]);
        assert_eq!(tf.tasks[0].due, Some(d("2023-02-01")));
    }

    #[test]
    fn toggle_marks_done_with_completion_prefix() {
        let mut tf = file_with(&["(A) 2023-01-01 buy milk"]);
        tf.toggle(&[0]);
        let t = &tf.tasks[0];
        assert!(t.done);
        let expected = format!("x {} (A) 2023-01-01 buy milk", ymd(today()));
        assert_eq!(t.original(), expected);
    }

    #[test]
    fn untoggle_strips_completion_prefix() {
        let mut tf = file_with(&["x 2023-02-01 (B) 2023-01-01 Pay rent rec:1m"]);
        tf.toggle(&[0]);
        let t = &tf.tasks[0];
        assert!(!t.done);
        assert!(t.completed.is_none());
        assert_eq!(t.original(), "(B) 2023-01-01 Pay rent rec:1m");
    }

    #[test]
    fn untoggle_stops_after_first_done_task() {
        let mut tf = file_with(&[
            "x 2023-01-02 first done thing",
            "x 2023-01-02 second done thing",
        ]);
        tf.toggle(&[0, 1]);
        assert!(!tf.tasks[0].done);
        assert!(tf.tasks[1].done);
    }

    #[test]
    fn toggle_recurring_task_appends_next_occurrence() {
        let mut tf = file_with(&["(C) Water plants rec:+1w due:2023-01-01"]);
        tf.toggle(&[0]);
        assert_eq!(tf.tasks.len(), 2);

        let original = &tf.tasks[0];
        assert!(original.done);
        assert_eq!(original.completed, Some(today()));

        let next = &tf.tasks[1];
        assert!(!next.done);
        assert_eq!(next.line_number, 1);
        // Strict recurrence: offset from the original due date.
        assert_eq!(next.due, Some(d("2023-01-08")));
        assert_eq!(next.created, Some(today()));
        let expected = format!("(C) {} Water plants rec:+1w due:2023-01-08", ymd(today()));
        assert_eq!(next.original(), expected);
    }

    #[test]
    fn replace_substitutes_pending_tasks_only() {
        let mut tf = file_with(&["old text", "x 2023-01-02 finished"]);
        tf.replace("(A) new text due:2023-03-01", 0);
        assert_eq!(tf.tasks[0].description, "new text");
        assert_eq!(tf.tasks[0].line_number, 0);

        tf.replace("should not happen", 1);
        assert_eq!(tf.tasks[1].description, "finished");
    }

    #[test]
    fn replace_empty_input_is_a_noop() {
        let mut tf = file_with(&["keep me"]);
        tf.replace("", 0);
        assert_eq!(tf.tasks[0].description, "keep me");
    }

    #[test]
    fn recurring_next_preserves_priority_and_refreshes_created() {
        let t = parse_task_at("(C) 2022-12-01 Water plants rec:+1w due:2023-01-01", d("2023-01-03")).unwrap();
        let next = t.recurring_next(d("2023-01-08"));
        assert_eq!(next.original(), "(C) 2023-01-08 Water plants rec:+1w due:2023-01-08");
        assert_eq!(next.created, Some(d("2023-01-08")));
        assert_eq!(next.priority, Priority::Letter('C'));
    }
}
