use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::model::file::TaskFile;
use crate::model::task::{Priority, Task};
use crate::parse::date::today;

/// One key of a multi-key sort order. `plus` is the default direction
/// (no suffix or `+`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    Due(bool),
    Threshold(bool),
    Priority(bool),
    Done(bool),
}

/// Parse a comma/space-separated sort order like `done,priority,due-`.
/// Unknown keys are ignored.
fn parse_sort_order(order: &str) -> Vec<SortKey> {
    order
        .to_ascii_lowercase()
        .replace(',', " ")
        .split_whitespace()
        .filter_map(|field| {
            let (name, plus) = match field.strip_suffix('-') {
                Some(name) => (name, false),
                None => (field.strip_suffix('+').unwrap_or(field), true),
            };
            match name {
                "due" | "d" => Some(SortKey::Due(plus)),
                "threshold" | "t" => Some(SortKey::Threshold(plus)),
                "priority" | "pri" | "p" => Some(SortKey::Priority(plus)),
                "done" | "x" => Some(SortKey::Done(plus)),
                _ => None,
            }
        })
        .collect()
}

/// Date key ordering: `+` puts the latest date first and missing dates last,
/// `-` puts the earliest first and missing dates first.
fn cmp_date(a: Option<NaiveDate>, b: Option<NaiveDate>, plus: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => {
            if plus {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Some(_), None) => {
            if plus {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (Some(x), Some(y)) => {
            if plus {
                y.cmp(&x)
            } else {
                x.cmp(&y)
            }
        }
    }
}

/// Priority ordering. A task with no priority sorts after any real letter
/// regardless of direction; only the letter comparison flips with `-`.
fn cmp_priority(a: Priority, b: Priority, plus: bool) -> Ordering {
    match (a, b) {
        (Priority::None, Priority::None) => Ordering::Equal,
        (Priority::None, Priority::Letter(_)) => Ordering::Greater,
        (Priority::Letter(_), Priority::None) => Ordering::Less,
        (Priority::Letter(x), Priority::Letter(y)) => {
            if plus {
                x.cmp(&y)
            } else {
                y.cmp(&x)
            }
        }
    }
}

/// Lexicographic key chain with an ascending line-number tie-break, so the
/// result is a total order for any input.
fn compare(a: &Task, b: &Task, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = match *key {
            SortKey::Due(plus) => cmp_date(a.due, b.due, plus),
            SortKey::Threshold(plus) => cmp_date(a.threshold, b.threshold, plus),
            SortKey::Priority(plus) => cmp_priority(a.priority, b.priority, plus),
            SortKey::Done(plus) => {
                if plus {
                    a.done.cmp(&b.done)
                } else {
                    b.done.cmp(&a.done)
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.line_number.cmp(&b.line_number)
}

impl TaskFile {
    /// Reorder the in-memory sequence by the file's configured sort order.
    /// Sorting is presentation-only: line numbers and identity are untouched.
    pub fn sort(&mut self) -> &mut Self {
        let order = self.opts.sort_order.clone();
        self.sort_by_order(&order)
    }

    pub fn sort_by_order(&mut self, order: &str) -> &mut Self {
        let keys = parse_sort_order(order);
        self.tasks.sort_by(|a, b| compare(a, b, &keys));
        self
    }

    /// Flag tasks with a future threshold as filtered-out unless the
    /// show-future option is set. Never removes tasks from the store.
    pub fn filter(&mut self) -> &mut Self {
        self.filter_at(today())
    }

    pub(crate) fn filter_at(&mut self, today: NaiveDate) -> &mut Self {
        let show_future = self.opts.show_future;
        for t in &mut self.tasks {
            t.filtered_out = !show_future && t.threshold.is_some_and(|th| th > today);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::file::LoadOpts;
    use crate::parse::task_parser::parse_task_at;
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

    fn order_of(tf: &TaskFile) -> Vec<usize> {
        tf.tasks.iter().map(|t| t.line_number).collect()
    }

    #[test]
    fn no_priority_sorts_last_in_both_directions() {
        let mut tf = file_with(&["no priority due:2023-01-01", "(A) has one due:2023-02-01"]);
        tf.sort_by_order("priority-,due+");
        assert_eq!(order_of(&tf), vec![1, 0]);
        tf.sort_by_order("priority+");
        assert_eq!(order_of(&tf), vec![1, 0]);
    }

    #[test]
    fn due_plus_puts_latest_first_and_missing_last() {
        let mut tf = file_with(&["a due:2023-01-01", "b due:2023-03-01", "c"]);
        tf.sort_by_order("due+");
        assert_eq!(order_of(&tf), vec![1, 0, 2]);
    }

    #[test]
    fn due_minus_puts_earliest_first_and_missing_first() {
        let mut tf = file_with(&["a due:2023-01-01", "b due:2023-03-01", "c"]);
        tf.sort_by_order("due-");
        assert_eq!(order_of(&tf), vec![2, 0, 1]);
    }

    #[test]
    fn done_key_groups_completion_state() {
        let mut tf = file_with(&["x 2023-01-02 done thing", "pending thing"]);
        tf.sort_by_order("done");
        assert_eq!(order_of(&tf), vec![1, 0]);
        tf.sort_by_order("x-");
        assert_eq!(order_of(&tf), vec![0, 1]);
    }

    #[test]
    fn line_number_breaks_all_ties() {
        let mut tf = file_with(&["same", "same", "same"]);
        tf.sort_by_order("due,priority,done");
        assert_eq!(order_of(&tf), vec![0, 1, 2]);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut tf = file_with(&["b", "a"]);
        tf.sort_by_order("bogus,alphabetical");
        assert_eq!(order_of(&tf), vec![0, 1]);
    }

    #[test]
    fn filter_flags_future_thresholds() {
        let mut tf = file_with(&[
            "past t:2023-01-01",
            "today t:2023-01-03",
            "future t:2023-02-01",
        ]);
        tf.filter_at(d("2023-01-03"));
        let flags: Vec<bool> = tf.tasks.iter().map(|t| t.filtered_out).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn filter_is_idempotent_and_respects_show_future() {
        let mut tf = file_with(&["future t:2023-02-01"]);
        tf.filter_at(d("2023-01-03"));
        tf.filter_at(d("2023-01-03"));
        assert!(tf.tasks[0].filtered_out);

        tf.opts.show_future = true;
        tf.filter_at(d("2023-01-03"));
        assert!(!tf.tasks[0].filtered_out);
    }

    #[test]
    fn default_sort_order_puts_pending_prioritized_first() {
        let mut tf = file_with(&[
            "x 2023-01-02 done thing",
            "plain thing",
            "(A) urgent thing due:2023-01-10",
            "(A) urgent thing due:2023-01-05",
        ]);
        tf.sort();
        assert_eq!(order_of(&tf), vec![3, 2, 1, 0]);
    }
}
