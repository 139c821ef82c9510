use chrono::{DateTime, ParseResult, TimeZone, Utc};
use regex::Regex;
use std::{fmt::Display, sync::LazyLock};

static TZ_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]\d{2}:?\d{2}$").expect("Invalid offset regex"));

fn has_explicit_zone(value: &str) -> bool {
    value.ends_with('Z') || TZ_OFFSET.is_match(value)
}

/// Parses a backend timestamp. Database timestamps come without a zone
/// suffix and are UTC, so a `Z` is appended when neither `Z` nor a numeric
/// offset is present.
pub fn parse_utc(value: &str) -> ParseResult<DateTime<Utc>> {
    let value = value.trim();
    let mut normalized = if has_explicit_zone(value) {
        value.to_string()
    } else {
        format!("{value}Z")
    };
    // "2024-01-15 10:30:00" style separators
    if normalized.as_bytes().get(10) == Some(&b' ') {
        normalized.replace_range(10..11, "T");
    }

    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

/// Coarsest whole unit elapsed between `then` and `now`.
pub fn relative_to(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);

    if elapsed.num_days() >= 1 {
        plural(elapsed.num_days(), "day")
    } else if elapsed.num_hours() >= 1 {
        plural(elapsed.num_hours(), "hour")
    } else if elapsed.num_minutes() >= 1 {
        plural(elapsed.num_minutes(), "minute")
    } else {
        "Just now".to_string()
    }
}

pub fn format_relative(value: &str, now: DateTime<Utc>) -> ParseResult<String> {
    Ok(relative_to(parse_utc(value)?, now))
}

/// "January 15, 2024" in the given zone.
pub fn format_date<Tz>(value: &str, tz: &Tz) -> ParseResult<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    Ok(parse_utc(value)?
        .with_timezone(tz)
        .format("%B %-d, %Y")
        .to_string())
}

/// "3:05 PM" in the given zone.
pub fn format_time<Tz>(value: &str, tz: &Tz) -> ParseResult<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    Ok(parse_utc(value)?
        .with_timezone(tz)
        .format("%-I:%M %p")
        .to_string())
}
