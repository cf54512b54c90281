//! Timestamp normalization.
//!
//! Every outlet renders publication times differently: `<time datetime>`
//! attributes in RFC 3339, naive ISO strings from search APIs, calendar
//! text like `Oct. 17, 2026`, or relative phrases like `3 hours ago`.
//! [`parse_at`] turns any of those into a UTC instant, trying absolute
//! formats first and relative phrases second. AP-style `Sept.` is read as
//! September.
//!
//! A token that matches nothing yields `None`. Callers substitute "now",
//! which lets the article through the recency filter. That permissive
//! fallback lives in [`normalize_or_now`] so it is applied in one place.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Date-time layouts carrying an offset that RFC 3339 rejects, such as `+0000`.
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%z"];

/// Naive date-time layouts, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Calendar-date layouts, interpreted as UTC midnight.
const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%b. %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
];

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s+(minute|hour|day)s?\s+ago").expect("relative date pattern is valid")
});

/// AP style abbreviates September as `Sept`; chrono only knows `Sep`.
static AP_SEPTEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsept\b").expect("september pattern is valid"));

/// Parse a timestamp token relative to the current clock.
#[cfg(test)]
pub fn parse(token: &str) -> Option<DateTime<Utc>> {
    parse_at(token, Utc::now())
}

/// Parse a timestamp token, resolving relative phrases against `now`.
pub fn parse_at(token: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    parse_absolute(token).or_else(|| parse_relative(token, now))
}

/// Parse `token`, falling back to `now` when nothing matches.
pub fn normalize_or_now(token: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    parse_at(token, now).unwrap_or(now)
}

/// Oldest instant inside a `days_back` window ending at `now`.
pub fn window_start(days_back: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days_back)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Early window check used by adapters. Tokens that do not parse are kept;
/// the merge stage gives them the "now" fallback and re-checks.
pub fn may_be_in_window(token: &str, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    parse_at(token, now).is_none_or(|published| published >= cutoff)
}

fn parse_absolute(token: &str) -> Option<DateTime<Utc>> {
    let token = AP_SEPTEMBER.replace(token, "Sep");
    let token = token.as_ref();
    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(token) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(token, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(token, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(token, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn parse_relative(token: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE.captures(token)?;
    let amount: i64 = caps[1].parse().ok()?;
    let delta = match caps[2].to_ascii_lowercase().as_str() {
        "minute" => Duration::try_minutes(amount)?,
        "hour" => Duration::try_hours(amount)?,
        "day" => Duration::try_days(amount)?,
        _ => return None,
    };
    now.checked_sub_signed(delta)
}
