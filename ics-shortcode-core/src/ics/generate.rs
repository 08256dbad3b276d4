//! ICS file generation.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::date::{format_utc, parse_date};
use crate::error::{ShortcodeError, ShortcodeResult};
use crate::options::EventOptions;

/// PRODID written into every generated calendar.
pub const PRODUCT_ID: &str = "-//ics-shortcode//NONSGML v1.0//EN";

/// Generate .ics content for stored event options.
///
/// Dates are interpreted in `tz`. Every call gets a fresh UID and the current
/// time as DTSTAMP.
pub fn generate_ics(options: &EventOptions, tz: Tz) -> ShortcodeResult<String> {
    let uid = uuid::Uuid::new_v4().to_string();
    generate_ics_at(options, tz, Utc::now(), &uid)
}

/// Generate .ics content with an explicit DTSTAMP and UID.
pub fn generate_ics_at(
    options: &EventOptions,
    tz: Tz,
    now: DateTime<Utc>,
    uid: &str,
) -> ShortcodeResult<String> {
    let start = parse_date(&options.start, tz)
        .ok_or_else(|| ShortcodeError::InvalidDate(options.start.clone()))?;
    let end = parse_date(&options.end, tz)
        .ok_or_else(|| ShortcodeError::InvalidDate(options.end.clone()))?;

    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODUCT_ID),
        "CALSCALE:GREGORIAN".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("DTEND:{}", format_utc(&end)),
        format!("UID:{}", uid),
        format!("DTSTAMP:{}", format_utc(&now)),
        format!("LOCATION:{}", escape_text(&options.location)),
        format!("DESCRIPTION:{}", escape_text(&options.description)),
        format!("URL;VALUE=URI:{}", escape_text(&options.link)),
        format!("SUMMARY:{}", escape_text(&options.title)),
        format!("DTSTART:{}", format_utc(&start)),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];

    let mut output = String::new();
    for line in &lines {
        output.push_str(line);
        output.push_str("\r\n");
    }

    Ok(output)
}

/// Backslash-escape commas and semicolons in a TEXT value.
///
/// Backslashes and newlines are passed through unchanged.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ',' || c == ';' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_test_options() -> EventOptions {
        EventOptions {
            start: "31.12.2014 22:00".to_string(),
            end: "01.01.2015 05:00".to_string(),
            title: "Party".to_string(),
            description: "Lorem ipsum".to_string(),
            location: "Kugl, St. Gallen".to_string(),
            link: "http://www.kugl.ch".to_string(),
            filename: "entry.ics".to_string(),
            linkclass: "calendar".to_string(),
            linktext: "Add to calendar".to_string(),
        }
    }

    fn zurich() -> Tz {
        "Europe/Zurich".parse().unwrap()
    }

    #[test]
    fn test_generate_ics_exact_layout() {
        let now = Utc.with_ymd_and_hms(2014, 12, 1, 8, 30, 0).unwrap();
        let ics = generate_ics_at(&make_test_options(), zurich(), now, "abc123").unwrap();

        let expected = "BEGIN:VCALENDAR\r\n\
            VERSION:2.0\r\n\
            PRODID:-//ics-shortcode//NONSGML v1.0//EN\r\n\
            CALSCALE:GREGORIAN\r\n\
            BEGIN:VEVENT\r\n\
            DTEND:20150101T040000Z\r\n\
            UID:abc123\r\n\
            DTSTAMP:20141201T083000Z\r\n\
            LOCATION:Kugl\\, St. Gallen\r\n\
            DESCRIPTION:Lorem ipsum\r\n\
            URL;VALUE=URI:http://www.kugl.ch\r\n\
            SUMMARY:Party\r\n\
            DTSTART:20141231T210000Z\r\n\
            END:VEVENT\r\n\
            END:VCALENDAR\r\n";
        assert_eq!(ics, expected);
    }

    #[test]
    fn test_generate_ics_uid_is_fresh_per_call() {
        let first = generate_ics(&make_test_options(), zurich()).unwrap();
        let second = generate_ics(&make_test_options(), zurich()).unwrap();

        let uid = |ics: &str| {
            ics.lines()
                .find(|l| l.starts_with("UID:"))
                .map(str::to_string)
                .unwrap()
        };
        assert_ne!(uid(&first), uid(&second));
    }

    #[test]
    fn test_generate_ics_is_parseable() {
        let ics = generate_ics(&make_test_options(), zurich()).unwrap();
        let calendar: icalendar::Calendar = ics.parse().unwrap();
        assert_eq!(calendar.components.len(), 1);
    }

    #[test]
    fn test_generate_ics_rejects_unparseable_dates() {
        let mut options = make_test_options();
        options.end = "whenever".to_string();
        assert!(matches!(
            generate_ics(&options, zurich()),
            Err(ShortcodeError::InvalidDate(d)) if d == "whenever"
        ));
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("Room A, B; C"), "Room A\\, B\\; C");
        assert_eq!(escape_text("plain"), "plain");
        assert_eq!(escape_text("back\\slash\nnewline"), "back\\slash\nnewline");
    }
}
