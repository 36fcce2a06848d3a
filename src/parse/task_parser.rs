use chrono::NaiveDate;

use crate::model::task::{Priority, Task};
use crate::parse::date::{looks_like_date, parse_ymd, resolve_from, today, ymd};
use crate::parse::recurrence::parse_recurrence;
use crate::parse::token::{scan_changes, scan_tags, PriorityToken};
use crate::parse::ParseError;

/// Parse one todo.txt line into a [`Task`].
///
/// Fails on an empty line and on malformed date tokens; callers loading a
/// whole file skip failed lines rather than aborting. Relative due/threshold
/// dates are canonicalized to `YYYY-MM-DD` inside the task's original text as
/// a side effect.
pub fn parse_task(line: &str) -> Result<Task, ParseError> {
    parse_task_at(line, today())
}

pub(crate) fn parse_task_at(line: &str, today: NaiveDate) -> Result<Task, ParseError> {
    let mut parts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        return Err(ParseError::EmptyLine);
    }

    let mut task = Task::from_line(line);

    // Completion marker: a leading `x` followed by a completion date.
    if parts.len() >= 2 && parts[0] == "x" && looks_like_date(&parts[1]) {
        task.done = true;
        task.completed = Some(parse_ymd(&parts[1])?);
        parts.drain(..2);
    }

    let mut working = parts.join(" ");
    let changes = scan_changes(&working);

    if let Some(PriorityToken::Set(c)) = changes.priority {
        task.priority = Priority::Letter(c);
        parts.remove(0);
        working = parts.join(" ");
    }

    // Creation date: a bare date as the next token.
    if parts.first().is_some_and(|p| looks_like_date(p)) {
        task.created = Some(parse_ymd(&parts[0])?);
        parts.remove(0);
        working = parts.join(" ");
    }

    if let Some(raw) = &changes.threshold {
        let d = resolve_from(raw, today, today)?;
        working = working.replace(&format!(" t:{raw}"), "");
        let rewritten = task
            .original()
            .replace(&format!(" t:{raw}"), &format!(" t:{}", ymd(d)));
        task.set_original(rewritten);
        task.threshold = Some(d);
        task.has_threshold = true;
    }

    if let Some(raw) = &changes.due {
        let d = resolve_from(raw, today, today)?;
        working = working.replace(&format!(" due:{raw}"), "");
        let rewritten = task
            .original()
            .replace(&format!(" due:{raw}"), &format!(" due:{}", ymd(d)));
        task.set_original(rewritten);
        task.due = Some(d);
        task.has_due = true;
        task.overdue = !task.done && d < today;
    }

    if let Some(raw) = &changes.recurrence {
        // A rec: token that doesn't fit the grammar stays in the description.
        if let Some(rec) = parse_recurrence(raw) {
            working = working.replace(&format!(" rec:{raw}"), "");
            task.recurrence = Some(rec);
        }
    }

    task.description = working.split_whitespace().collect::<Vec<_>>().join(" ");
    let (projects, contexts) = scan_tags(&task.description);
    task.projects = projects;
    task.contexts = contexts;

    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn parse_at(line: &str, now: &str) -> Task {
        parse_task_at(line, d(now)).unwrap()
    }

    #[test]
    fn parses_a_full_line() {
        let t = parse_at(
            "(A) 2023-01-01 Buy milk +errands @store due:2023-01-05",
            "2023-01-03",
        );
        assert_eq!(t.priority, Priority::Letter('A'));
        assert_eq!(t.created, Some(d("2023-01-01")));
        assert_eq!(t.description, "Buy milk +errands @store");
        assert_eq!(t.due, Some(d("2023-01-05")));
        assert!(t.has_due);
        assert!(!t.overdue);
        assert_eq!(t.projects, vec!["errands"]);
        assert_eq!(t.contexts, vec!["store"]);
        assert!(!t.done);
    }

    #[test]
    fn parses_completion_marker() {
        let t = parse_at("x 2023-02-01 (B) 2023-01-01 Pay rent rec:1m", "2023-02-02");
        assert!(t.done);
        assert_eq!(t.completed, Some(d("2023-02-01")));
        assert_eq!(t.priority, Priority::Letter('B'));
        assert_eq!(t.created, Some(d("2023-01-01")));
        assert_eq!(t.description, "Pay rent");
        let r = t.recurrence.unwrap();
        assert_eq!(r.raw, "1m");
        assert!(!r.strict);
    }

    #[test]
    fn bare_x_without_date_is_description() {
        let t = parse_at("x marks the spot", "2023-01-01");
        assert!(!t.done);
        assert_eq!(t.description, "x marks the spot");
    }

    #[test]
    fn empty_line_fails() {
        assert!(matches!(parse_task("   "), Err(ParseError::EmptyLine)));
    }

    #[test]
    fn malformed_date_fails_the_line() {
        assert!(parse_task_at("call mum due:2023-13-40", d("2023-01-01")).is_err());
        assert!(parse_task_at("x 2023-99-01 done thing", d("2023-01-01")).is_err());
    }

    #[test]
    fn relative_dates_are_canonicalized_in_place() {
        let t = parse_at("water plants due:tomorrow t:today", "2023-06-01");
        assert_eq!(t.due, Some(d("2023-06-02")));
        assert_eq!(t.threshold, Some(d("2023-06-01")));
        assert_eq!(t.original(), "water plants due:2023-06-02 t:2023-06-01");
    }

    #[test]
    fn overdue_is_derived_from_due_and_done() {
        let t = parse_at("pay rent due:2023-01-01", "2023-02-01");
        assert!(t.overdue);
        let t = parse_at("x 2023-01-02 pay rent due:2023-01-01", "2023-02-01");
        assert!(!t.overdue);
    }

    #[test]
    fn unparseable_recurrence_stays_in_description() {
        let t = parse_at("ping server rec:often", "2023-01-01");
        assert!(t.recurrence.is_none());
        assert_eq!(t.description, "ping server rec:often");
    }

    #[test]
    fn no_priority_means_sentinel_none() {
        let t = parse_at("just a note", "2023-01-01");
        assert_eq!(t.priority, Priority::None);
    }

    #[test]
    fn round_trips_through_original() {
        let line = "(A) 2023-01-01 Buy milk +errands @store due:2023-01-05";
        let t = parse_at(line, "2023-01-03");
        assert_eq!(t.original(), line);
        let again = parse_task_at(t.original(), d("2023-01-03")).unwrap();
        assert_eq!(again.description, t.description);
        assert_eq!(again.priority, t.priority);
        assert_eq!(again.due, t.due);
        assert_eq!(again.created, t.created);
    }
}
