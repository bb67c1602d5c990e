/// Month bucketing and ordering helpers shared by the calculator,
/// the regenerator and the stores. All functions are pure.
use chrono::{DateTime, Datelike, Months, NaiveDate};

/// Anything that belongs to a calendar month.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// Truncate a date to the first day of its month.
#[inline]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Month start `n` months before `month`. Saturates at the earliest
/// representable date.
pub fn months_before(month: NaiveDate, n: u32) -> NaiveDate {
    month_start(month)
        .checked_sub_months(Months::new(n))
        .unwrap_or(NaiveDate::MIN)
}

/// Parse `YYYY-MM`, `YYYY-MM-DD` or an RFC 3339 timestamp, truncated to the month.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.naive_utc().date()))
        .or_else(|| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok())?;
    Some(month_start(date))
}

/// ISO-8601 rendering of a month start at UTC midnight.
pub fn to_iso(month: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", month.format("%Y-%m-%d"))
}

/// Stable ascending sort by month.
pub fn sort_ascending<T: Dated>(rows: &mut [T]) {
    rows.sort_by_key(|r| r.date());
}

/// The most recent row and, when present, the one before it.
pub fn latest_pair<T: Dated>(rows: &[T]) -> Option<(&T, Option<&T>)> {
    let mut ordered: Vec<&T> = rows.iter().collect();
    ordered.sort_by_key(|r| std::cmp::Reverse(r.date()));
    let mut iter = ordered.into_iter();
    let latest = iter.next()?;
    Some((latest, iter.next()))
}
