//! The fixed, ordered table of date formats accepted by `date()`.
//!
//! First match wins. Formats carrying a zone offset resolve to that offset;
//! formats without one are interpreted in local time; the clock-only kitchen
//! format lands on day one of year zero.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

/// Tries the accepted formats in their fixed order:
/// ANSIC, Unix date, Ruby date, kitchen clock, RFC 3339 (with or without
/// fractional seconds), then the ISO-8601 ladder: day, day+minutes,
/// day+seconds, day+seconds+zone, and the `T`-separated hour / minute /
/// second / nanosecond variants with a `Z` or numeric zone suffix.
pub(crate) fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    // ANSIC "Mon Jan  2 15:04:05 2006" and Unix date with a zone name; the
    // zone abbreviation carries no offset information and is skipped
    for format in ["%a %b %e %H:%M:%S %Y", "%a %b %e %H:%M:%S %Z %Y"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return from_local(naive);
        }
    }

    // Ruby date "Mon Jan 02 15:04:05 -0700 2006"
    if let Ok(parsed) = DateTime::parse_from_str(s, "%a %b %d %H:%M:%S %z %Y") {
        return Some(parsed);
    }

    // Kitchen clock "3:04PM"
    if let Ok(clock) = NaiveTime::parse_from_str(s, "%I:%M%p") {
        let day_one = NaiveDate::from_ymd_opt(0, 1, 1)?;
        return from_local(day_one.and_time(clock));
    }

    // RFC 3339, fractional seconds included
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed);
    }

    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return from_local(day.and_time(NaiveTime::MIN));
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return from_local(naive);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(parsed);
    }

    // ISO-8601 with a trailing `Z` or numeric zone; the bare-hour variant
    // gets its minute filled in before parsing
    if let Some(parsed) = parse_iso_hour(s) {
        return Some(parsed);
    }
    for (naive_format, zoned_format) in [
        ("%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M%z"),
        ("%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%z"),
        ("%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f%z"),
    ] {
        if let Some(parsed) = parse_zulu_or_zoned(s, naive_format, zoned_format) {
            return Some(parsed);
        }
    }

    None
}

/// Accepts either a literal `Z` suffix (UTC) or a numeric zone offset.
fn parse_zulu_or_zoned(
    s: &str,
    naive_format: &str,
    zoned_format: &str,
) -> Option<DateTime<FixedOffset>> {
    if let Some(stripped) = s.strip_suffix('Z') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, naive_format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    DateTime::parse_from_str(s, zoned_format).ok()
}

/// `2006-01-02T15Z0700`: hour precision, which chrono cannot parse directly
/// because a time needs at least minutes.
fn parse_iso_hour(s: &str) -> Option<DateTime<FixedOffset>> {
    const HEAD: usize = "2006-01-02T15".len();
    if s.len() <= HEAD || !s.is_char_boundary(HEAD) {
        return None;
    }
    let (head, zone) = s.split_at(HEAD);
    parse_zulu_or_zoned(
        &format!("{}:00{}", head, zone),
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M%z",
    )
}

fn from_local(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|resolved| resolved.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_rfc3339() {
        let parsed = parse_date("2021-06-15T10:30:00+02:00").unwrap();
        assert_eq!(parsed.hour(), 10);
        assert_eq!(parsed.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_date_only() {
        let parsed = parse_date("2021-06-15").unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2021, 6, 15));
        assert_eq!((parsed.hour(), parsed.minute()), (0, 0));
    }

    #[test]
    fn test_date_with_minutes_and_seconds() {
        assert!(parse_date("2021-06-15 10:30").is_some());
        assert!(parse_date("2021-06-15 10:30:45").is_some());
        assert!(parse_date("2021-06-15 10:30:45+02:00").is_some());
    }

    #[test]
    fn test_ansic_and_ruby() {
        assert!(parse_date("Mon Jan  2 15:04:05 2006").is_some());
        assert!(parse_date("Mon Jan 02 15:04:05 -0700 2006").is_some());
    }

    #[test]
    fn test_kitchen_clock() {
        let parsed = parse_date("3:04PM").unwrap();
        assert_eq!((parsed.hour(), parsed.minute()), (15, 4));
    }

    #[test]
    fn test_iso_variants() {
        assert!(parse_date("2021-06-15T10Z").is_some());
        assert!(parse_date("2021-06-15T10:30Z").is_some());
        assert!(parse_date("2021-06-15T10:30:45+0200").is_some());
        assert!(parse_date("2021-06-15T10:30:45.123456789Z").is_some());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("2021-13-45").is_none());
    }
}
