use chrono::{Days, Months, NaiveDate};

use crate::model::task::{Period, Recurrence};
use crate::parse::date::today;

/// Parse a recurrence token: optional `+` (strict), optional count
/// (default 1), one unit char from `dwmy`. Returns `None` when the token
/// doesn't fit the grammar, so callers can leave it in the description.
pub fn parse_recurrence(token: &str) -> Option<Recurrence> {
    let rest = token.strip_prefix('+');
    let strict = rest.is_some();
    let rest = rest.unwrap_or(token);

    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let unit = &rest[digits.len()..];
    let mut chars = unit.chars();
    let period = Period::from_char(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }

    let every = if digits.is_empty() {
        1
    } else {
        digits.parse().ok()?
    };

    Some(Recurrence {
        period,
        every,
        strict,
        raw: token.to_string(),
    })
}

impl Recurrence {
    /// Next occurrence after `anchor` (the current due or threshold date).
    pub fn next(&self, anchor: NaiveDate) -> NaiveDate {
        self.next_from(anchor, today())
    }

    /// [`Recurrence::next`] with an explicit "today". A non-strict rule
    /// discards the anchor and counts forward from today; a strict one keeps
    /// its cadence anchored to the original date.
    pub fn next_from(&self, anchor: NaiveDate, today: NaiveDate) -> NaiveDate {
        let from = if self.strict { anchor } else { today };
        match self.period {
            Period::Day => from
                .checked_add_days(Days::new(u64::from(self.every)))
                .unwrap_or(from),
            Period::Week => from
                .checked_add_days(Days::new(u64::from(self.every) * 7))
                .unwrap_or(from),
            Period::Month => from
                .checked_add_months(Months::new(self.every))
                .unwrap_or(from),
            Period::Year => from
                .checked_add_months(Months::new(self.every * 12))
                .unwrap_or(from),
        }
    }
}
