//! Free-form date parsing and iCalendar UTC formatting.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Layout of UTC date-times in iCalendar output.
const ICS_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Layouts carrying an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M %z",
    "%d.%m.%Y %H:%M:%S %z",
    "%d.%m.%Y %H:%M %z",
];

/// Date-time layouts, tried in order. Two-digit years come first so that
/// `%Y` never reads "14" as year 14.
const DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%y %H:%M",
    "%d.%m.%y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M%p",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M%p",
    "%B %d, %Y %I%p",
    "%B %d, %Y %I %p",
    "%d %B %Y %H:%M",
    "%Y%m%dT%H%M%S",
];

/// Date-only layouts, interpreted as midnight.
const DATE_FORMATS: &[&str] = &[
    "%d.%m.%y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

/// Parse a free-form date/time expression.
///
/// Expressions without an explicit offset are wall-clock times in `tz`.
/// Returns `None` when the input is not a recognizable date.
pub fn parse_date(input: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    // Unix timestamp
    if let Some(secs) = input.strip_prefix('@') {
        let secs: i64 = secs.trim().parse().ok()?;
        return Utc.timestamp_opt(secs, 0).single();
    }

    // Explicit offsets take precedence over the site timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .filter_map(|format| DateTime::parse_from_str(input, format).ok())
        .find(|dt| dt.year() >= 100)
    {
        return Some(dt.with_timezone(&Utc));
    }

    parse_naive(input).and_then(|naive| localize(naive, tz))
}

/// Whether `input` names an existing instant when read in `tz`.
pub fn is_parseable(input: &str, tz: Tz) -> bool {
    parse_date(input, tz).is_some()
}

/// Format an instant as an iCalendar UTC date-time (`YYYYMMDDTHHMMSSZ`).
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format(ICS_UTC_FORMAT).to_string()
}

fn parse_naive(input: &str) -> Option<NaiveDateTime> {
    let datetimes = DATETIME_FORMATS
        .iter()
        .filter_map(|format| NaiveDateTime::parse_from_str(input, format).ok());
    let dates = DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(input, format).ok())
        .filter_map(|d| d.and_hms_opt(0, 0, 0));

    // Years below 100 only come from a 4-digit layout fed a short year
    if let Some(dt) = datetimes.chain(dates).find(|dt| dt.year() >= 100) {
        return Some(dt);
    }

    // Natural language ("tomorrow 5pm", "next friday")
    let dt = fuzzydate::parse(&expand_abbreviations(&input.replace(',', " "))).ok()?;

    if has_time_component(input) {
        Some(dt)
    } else {
        dt.date().and_hms_opt(0, 0, 0)
    }
}

/// Check if the input string contains time-related tokens.
fn has_time_component(input: &str) -> bool {
    let lower = input.to_lowercase();

    if lower.contains("now") || lower.contains("noon") || lower.contains("midnight") {
        return true;
    }

    // am/pm patterns like "6pm", "6 pm", "11am"
    let bytes = lower.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'a' || b == b'p') && bytes.get(i + 1) == Some(&b'm') {
            if i > 0 && bytes[i - 1].is_ascii_digit() {
                return true;
            }
            if i > 1 && bytes[i - 1] == b' ' && bytes[i - 2].is_ascii_digit() {
                return true;
            }
        }
    }

    // HH:MM
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' {
            let has_digit_before = i > 0 && bytes[i - 1].is_ascii_digit();
            let has_digit_after = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
            if has_digit_before && has_digit_after {
                return true;
            }
        }
    }

    // "at" followed by a digit ("at 3", "friday at 15")
    lower
        .split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .any(|w| w[0] == "at" && w[1].starts_with(|c: char| c.is_ascii_digit()))
}

/// Attach `tz` to a wall-clock time.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times in a
/// DST gap are moved forward by the length of the gap.
fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Expand common abbreviations that fuzzydate doesn't handle.
fn expand_abbreviations(input: &str) -> String {
    let abbrevs = [
        ("mon", "monday"),
        ("tue", "tuesday"),
        ("tues", "tuesday"),
        ("wed", "wednesday"),
        ("thu", "thursday"),
        ("thur", "thursday"),
        ("thurs", "thursday"),
        ("fri", "friday"),
        ("sat", "saturday"),
        ("sun", "sunday"),
        ("jan", "january"),
        ("feb", "february"),
        ("mar", "march"),
        ("apr", "april"),
        ("jun", "june"),
        ("jul", "july"),
        ("aug", "august"),
        ("sep", "september"),
        ("sept", "september"),
        ("oct", "october"),
        ("nov", "november"),
        ("dec", "december"),
    ];

    input
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            abbrevs
                .iter()
                .find(|(abbr, _)| *abbr == word)
                .map(|(_, full)| *full)
                .unwrap_or(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(input: &str, tz: Tz) -> String {
        format_utc(&parse_date(input, tz).unwrap())
    }

    #[test]
    fn test_dotted_european_format_in_site_timezone() {
        let tz: Tz = "Europe/Zurich".parse().unwrap();
        assert_eq!(utc("31.12.2014 22:00", tz), "20141231T210000Z");
        assert_eq!(utc("01.01.2015 05:00", tz), "20150101T040000Z");
    }

    #[test]
    fn test_summer_time_applies() {
        let tz: Tz = "Europe/Zurich".parse().unwrap();
        assert_eq!(utc("2015-07-01 12:00", tz), "20150701T100000Z");
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(utc("31.12.2014", Tz::UTC), "20141231T000000Z");
        assert_eq!(utc("2014-12-31", Tz::UTC), "20141231T000000Z");
    }

    #[test]
    fn test_us_format_with_meridiem() {
        assert_eq!(utc("12/31/2014 10:30 pm", Tz::UTC), "20141231T223000Z");
    }

    #[test]
    fn test_explicit_offset_ignores_site_timezone() {
        let tz: Tz = "America/New_York".parse().unwrap();
        assert_eq!(utc("2014-12-31T22:00:00+02:00", tz), "20141231T200000Z");
    }

    #[test]
    fn test_unix_timestamp() {
        assert_eq!(utc("@0", Tz::UTC), "19700101T000000Z");
        assert!(parse_date("@soon", Tz::UTC).is_none());
    }

    #[test]
    fn test_dst_gap_moves_forward() {
        let tz: Tz = "Europe/Zurich".parse().unwrap();
        // 02:30 does not exist on 2015-03-29 in Zurich; 03:30 CEST is 01:30Z
        assert_eq!(utc("29.03.2015 02:30", tz), "20150329T013000Z");
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(utc("31.12.14 22:00", Tz::UTC), "20141231T220000Z");
        assert_eq!(utc("31.12.14", Tz::UTC), "20141231T000000Z");
        assert_eq!(utc("12/31/14 22:00", Tz::UTC), "20141231T220000Z");
    }

    #[test]
    fn test_numeric_offset_with_space() {
        let tz: Tz = "America/New_York".parse().unwrap();
        assert_eq!(utc("2014-12-31 22:00:00 +0100", tz), "20141231T210000Z");
        assert_eq!(utc("31.12.2014 22:00 +01:00", tz), "20141231T210000Z");
    }

    #[test]
    fn test_month_names() {
        assert_eq!(utc("31 December 2014", Tz::UTC), "20141231T000000Z");
        assert_eq!(utc("Dec 31 2014", Tz::UTC), "20141231T000000Z");
        assert_eq!(utc("December 31, 2014", Tz::UTC), "20141231T000000Z");
        assert_eq!(utc("December 31, 2014 10pm", Tz::UTC), "20141231T220000Z");
        assert_eq!(utc("31 December 2014 22:15", Tz::UTC), "20141231T221500Z");
    }

    #[test]
    fn test_natural_language_without_time_is_midnight() {
        let first = parse_date("tomorrow", Tz::UTC).unwrap();
        assert_eq!(first.format("%H%M%S").to_string(), "000000");
        assert_eq!(parse_date("tomorrow", Tz::UTC), Some(first));
    }

    #[test]
    fn test_has_time_component() {
        assert!(has_time_component("tomorrow 5pm"));
        assert!(has_time_component("friday at 15"));
        assert!(has_time_component("next monday 10:30"));
        assert!(has_time_component("now"));
        assert!(!has_time_component("tomorrow"));
        assert!(!has_time_component("31 december 2014"));
    }

    #[test]
    fn test_long_dst_gap_is_not_parseable() {
        // Troll Station jumps from +00 to +02 at 01:00 UTC
        let troll: Tz = "Antarctica/Troll".parse().unwrap();
        assert!(!is_parseable("29.03.2015 01:30", troll));
        assert!(is_parseable("29.03.2015 01:30", Tz::UTC));
    }

    #[test]
    fn test_garbage_is_not_parseable() {
        assert!(!is_parseable("not-a-date", Tz::UTC));
        assert!(!is_parseable("", Tz::UTC));
        assert!(!is_parseable("   ", Tz::UTC));
    }

    #[test]
    fn test_expand_abbreviations() {
        assert_eq!(expand_abbreviations("Next Fri"), "next friday");
        assert_eq!(expand_abbreviations("3 dec"), "3 december");
    }
}
