use chrono::{Datelike, Local, NaiveDate, Weekday};

use crate::parse::recurrence::parse_recurrence;
use crate::parse::ParseError;

/// Format a date in the canonical `YYYY-MM-DD` form used throughout the file.
pub fn ymd(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn parse_ymd(s: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|source| ParseError::BadDate {
        token: s.to_string(),
        source,
    })
}

/// Cheap shape check for `\d{4}-\d\d-\d\d`, used to decide whether a token
/// is meant to be a date before committing to a full parse.
pub fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolve a date token to an absolute date.
///
/// Accepts absolute `YYYY-MM-DD`, the keywords `today`/`tomorrow`, weekday
/// names (next occurrence of that weekday, 0 days if today), or a
/// recurrence-shaped offset (`[+]<n><unit>`). Offsets go through the
/// recurrence calculator: a strict (`+`) offset is applied to `base`, a
/// non-strict one counts forward from today.
pub fn resolve(token: &str, base: NaiveDate) -> Result<NaiveDate, ParseError> {
    resolve_from(token, base, today())
}

/// [`resolve`] with an explicit "today", so date arithmetic stays testable.
pub fn resolve_from(token: &str, base: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ParseError> {
    if looks_like_date(token) {
        return parse_ymd(token);
    }

    let lower = token.to_ascii_lowercase();
    let offset = match lower.as_str() {
        "today" | "t" | "tday" | "tod" => return Ok(today),
        "tomorrow" | "tm" | "tom" => Some("1d".to_string()),
        "monday" | "mon" => Some(days_until(Weekday::Mon, today)),
        "tuesday" | "tue" => Some(days_until(Weekday::Tue, today)),
        "wednesday" | "wed" => Some(days_until(Weekday::Wed, today)),
        "thursday" | "thu" => Some(days_until(Weekday::Thu, today)),
        "friday" | "fri" => Some(days_until(Weekday::Fri, today)),
        "saturday" | "sat" => Some(days_until(Weekday::Sat, today)),
        "sunday" | "sun" => Some(days_until(Weekday::Sun, today)),
        _ => None,
    };
    let offset = offset.unwrap_or(lower);

    let rec = parse_recurrence(&offset)
        .ok_or_else(|| ParseError::UnknownDate(token.to_string()))?;
    Ok(rec.next_from(base, today))
}

/// Days until the next occurrence of `target`, as a `<n>d` offset token.
fn days_until(target: Weekday, today: NaiveDate) -> String {
    let n = (7 + target.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    format!("{n}d")
}
