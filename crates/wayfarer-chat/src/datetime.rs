//! Date/time normalization for assistant-supplied spot times.
//!
//! Whatever the assistant sends ends up as a canonical local
//! `YYYY-MM-DDTHH:MM` string. Missing or unreadable values fall back to the
//! current time; any value that had to change is flagged `adjusted` so the
//! confirmation can ask the user to review it.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::debug;
use wayfarer_core::{format_canonical, has_canonical_year};

use crate::command::DATETIME_UNSPECIFIED;
use crate::types::NormalizedDateTime;

/// Local wall-clock layouts, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %H:%M",
    "%b %d, %Y %I:%M %p",
    "%d %B %Y %H:%M",
];

/// Offset-bearing layouts beyond RFC 3339 and RFC 2822.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z"];

/// Date-only layouts that mean local midnight.
const LOCAL_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

/// Converts raw assistant date strings into canonical local time.
pub struct DateNormalizer;

impl DateNormalizer {
    /// Normalize against the system clock and zone.
    pub fn normalize(raw: &str) -> NormalizedDateTime {
        Self::normalize_at(raw, Local::now())
    }

    /// Normalize relative to `now`. Offset-bearing inputs are converted into
    /// `now`'s time zone.
    ///
    /// Never fails: the sentinel, blank input, and unparsable input all
    /// resolve to `now` with `adjusted` set.
    pub fn normalize_at<Tz: TimeZone>(raw: &str, now: DateTime<Tz>) -> NormalizedDateTime {
        let zone = now.timezone();
        let fallback = || NormalizedDateTime {
            canonical: format_canonical(&now.naive_local()),
            adjusted: true,
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == DATETIME_UNSPECIFIED {
            return fallback();
        }

        let Some(local) = parse_flexible(trimmed, &zone).filter(has_canonical_year) else {
            debug!(raw, "Unparsable date/time, substituting current time");
            return fallback();
        };

        let canonical = format_canonical(&local);
        let adjusted = canonical != raw;
        if adjusted {
            debug!(raw, canonical = %canonical, "Date/time reformatted");
        }
        NormalizedDateTime {
            canonical,
            adjusted,
        }
    }
}

/// Parse `s` into wall-clock time in `zone`.
fn parse_flexible<Tz: TimeZone>(s: &str, zone: &Tz) -> Option<NaiveDateTime> {
    if let Some(utc) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        if let Some(naive) = parse_naive(utc) {
            return Some(in_zone(&Utc.from_utc_datetime(&naive), zone));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(in_zone(&dt, zone));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(in_zone(&dt, zone));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(in_zone(&dt, zone));
    }

    if let Some(naive) = parse_naive(s) {
        return Some(naive);
    }

    // A bare ISO date is midnight UTC; other date-only forms are local midnight.
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(in_zone(&Utc.from_utc_datetime(&midnight), zone));
    }
    LOCAL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn in_zone<A: TimeZone, B: TimeZone>(dt: &DateTime<A>, zone: &B) -> NaiveDateTime {
    dt.with_timezone(zone).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    /// 2024-07-01 09:15 at UTC+09:00.
    fn tokyo_now() -> DateTime<FixedOffset> {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        tokyo.with_ymd_and_hms(2024, 7, 1, 9, 15, 42).unwrap()
    }

    fn norm(raw: &str) -> NormalizedDateTime {
        DateNormalizer::normalize_at(raw, tokyo_now())
    }

    // ---- Substitution ----

    #[test]
    fn test_sentinel_uses_now() {
        let n = norm("DATETIME_UNSPECIFIED");
        assert_eq!(n.canonical, "2024-07-01T09:15");
        assert!(n.adjusted);
    }

    #[test]
    fn test_blank_uses_now() {
        for raw in ["", "   ", "\n"] {
            let n = norm(raw);
            assert_eq!(n.canonical, "2024-07-01T09:15");
            assert!(n.adjusted);
        }
    }

    #[test]
    fn test_garbage_uses_now() {
        for raw in ["tomorrow afternoon", "2024-13-45T99:99", "next week"] {
            let n = norm(raw);
            assert_eq!(n.canonical, "2024-07-01T09:15", "input {raw:?}");
            assert!(n.adjusted);
        }
    }

    #[test]
    fn test_year_beyond_four_digits_uses_now() {
        for raw in ["+12345-01-01T10:00", "+10000-06-01 12:00"] {
            let n = norm(raw);
            assert_eq!(n.canonical, "2024-07-01T09:15", "input {raw:?}");
            assert!(n.adjusted);
        }
    }

    // ---- Canonical pass-through ----

    #[test]
    fn test_canonical_is_unchanged() {
        let n = norm("2024-07-15T14:30");
        assert_eq!(n.canonical, "2024-07-15T14:30");
        assert!(!n.adjusted);
    }

    // ---- Reformatting ----

    #[test]
    fn test_seconds_are_dropped() {
        let n = norm("2024-07-15T14:30:59");
        assert_eq!(n.canonical, "2024-07-15T14:30");
        assert!(n.adjusted);
    }

    #[test]
    fn test_space_separated() {
        let n = norm("2024-07-15 14:30");
        assert_eq!(n.canonical, "2024-07-15T14:30");
        assert!(n.adjusted);
    }

    #[test]
    fn test_surrounding_whitespace_is_adjusted() {
        let n = norm(" 2024-07-15T14:30 ");
        assert_eq!(n.canonical, "2024-07-15T14:30");
        assert!(n.adjusted);
    }

    #[test]
    fn test_long_month_name() {
        let n = norm("July 15, 2024 2:30 PM");
        assert_eq!(n.canonical, "2024-07-15T14:30");
        assert!(n.adjusted);
    }

    #[test]
    fn test_local_date_only_is_midnight() {
        let n = norm("July 20, 2024");
        assert_eq!(n.canonical, "2024-07-20T00:00");
        assert!(n.adjusted);
    }

    // ---- Offsets ----

    #[test]
    fn test_utc_designator_converts_to_local() {
        let n = norm("2024-07-20T10:00Z");
        assert_eq!(n.canonical, "2024-07-20T19:00");
        assert!(n.adjusted);
    }

    #[test]
    fn test_rfc3339_offset_converts_to_local() {
        let n = norm("2024-07-20T10:00:00-05:00");
        assert_eq!(n.canonical, "2024-07-21T00:00");
        assert!(n.adjusted);
    }

    #[test]
    fn test_same_offset_still_flags_adjusted() {
        let n = norm("2024-07-20T10:00+09:00");
        assert_eq!(n.canonical, "2024-07-20T10:00");
        assert!(n.adjusted);
    }

    #[test]
    fn test_iso_date_only_is_utc_midnight() {
        let n = norm("2024-07-20");
        assert_eq!(n.canonical, "2024-07-20T09:00");
        assert!(n.adjusted);
    }

    #[test]
    fn test_rfc2822() {
        let n = norm("Sat, 20 Jul 2024 10:00:00 +0000");
        assert_eq!(n.canonical, "2024-07-20T19:00");
        assert!(n.adjusted);
    }

    // ---- System clock ----

    #[test]
    fn test_normalize_with_system_clock_is_canonical() {
        let n = DateNormalizer::normalize("DATETIME_UNSPECIFIED");
        assert!(wayfarer_core::parse_canonical(&n.canonical).is_some());
        assert!(n.adjusted);
    }
}
