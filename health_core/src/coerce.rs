//! Best-effort coercion of raw CSV fields.
//!
//! Nothing in here fails: a value that cannot be interpreted comes back as
//! `None` and the caller decides whether that means "skip the row" (dates) or
//! "count as zero" (quantities).

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date-time layouts seen across the supported exports.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a date or date-time string, keeping the wall-clock value.
///
/// Date-only inputs resolve to midnight. Offsets in RFC 3339 strings are
/// dropped rather than converted, so the calendar date matches what the
/// exporting app displayed.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a date or date-time string and truncate it to the calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date())
}

/// Parse a decimal number. Non-finite values count as unparseable.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an optional numeric field, defaulting anything absent or invalid to zero.
pub fn number_or_zero(raw: Option<&str>) -> f64 {
    raw.and_then(parse_number).unwrap_or(0.0)
}

/// Parse an integral code such as an activity type.
///
/// Exports written by spreadsheet tools sometimes carry `15002.0`; that is
/// accepted, while a genuinely fractional value is not a code.
pub fn parse_code(raw: &str) -> Option<i64> {
    let value = parse_number(raw)?;
    if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

/// Trimmed, non-empty text or `None`.
pub fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}
