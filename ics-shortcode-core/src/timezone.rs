//! Site timezone resolution.
//!
//! Dates written in a shortcode are wall-clock times in the site's timezone.
//! The zone is resolved from the configured timezone name first, then from the
//! configured UTC offset, and finally falls back to UTC.

use chrono_tz::Tz;

/// Fractional offsets (in hours) that have no `Etc/GMT` zone, mapped to a
/// representative IANA zone.
const FRACTIONAL_OFFSETS: &[(f64, &str)] = &[
    (-9.5, "Pacific/Marquesas"),
    (-3.5, "America/St_Johns"),
    (3.5, "Asia/Tehran"),
    (4.5, "Asia/Kabul"),
    (5.5, "Asia/Kolkata"),
    (5.75, "Asia/Kathmandu"),
    (6.5, "Asia/Yangon"),
    (8.75, "Australia/Eucla"),
    (9.5, "Australia/Darwin"),
    (10.5, "Australia/Lord_Howe"),
    (12.75, "Pacific/Chatham"),
];

/// Resolve the timezone name for a site.
///
/// `timezone_string` wins when set and known. Otherwise the UTC offset in
/// hours is mapped to a zone name; an offset of zero, or one that maps to no
/// zone, resolves to `"UTC"`.
pub fn resolve_timezone_name(timezone_string: Option<&str>, gmt_offset: f64) -> String {
    if let Some(name) = timezone_string.map(str::trim).filter(|s| !s.is_empty()) {
        if name.parse::<Tz>().is_ok() {
            return name.to_string();
        }
        tracing::warn!(timezone = name, "unknown_timezone_string");
    }

    if gmt_offset == 0.0 || !gmt_offset.is_finite() {
        return "UTC".to_string();
    }

    timezone_name_from_offset(gmt_offset).unwrap_or_else(|| "UTC".to_string())
}

/// Resolve the site timezone, see [`resolve_timezone_name`].
pub fn resolve_timezone(timezone_string: Option<&str>, gmt_offset: f64) -> Tz {
    resolve_timezone_name(timezone_string, gmt_offset)
        .parse()
        .unwrap_or(Tz::UTC)
}

/// Guess a zone name from a UTC offset in hours.
fn timezone_name_from_offset(gmt_offset: f64) -> Option<String> {
    if gmt_offset.fract() == 0.0 {
        let hours = gmt_offset as i32;
        if !(-12..=14).contains(&hours) {
            return None;
        }
        // Etc/GMT zones use POSIX sign conventions: UTC+2 is "Etc/GMT-2".
        let name = if hours > 0 {
            format!("Etc/GMT-{}", hours)
        } else {
            format!("Etc/GMT+{}", -hours)
        };
        return Some(name);
    }

    FRACTIONAL_OFFSETS
        .iter()
        .find(|(offset, _)| (offset - gmt_offset).abs() < f64::EPSILON)
        .map(|(_, name)| name.to_string())
}
