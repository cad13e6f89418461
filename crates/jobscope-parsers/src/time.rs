//! Duration and timestamp parsing for scheduler output.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::time::Duration;

/// Parse a scheduler timestamp (YYYY-MM-DDTHH:MM:SS or placeholder values).
///
/// Returns None for empty strings or placeholder values like "N/A",
/// "Unknown", "None". A running job reports "Unknown" as its end time.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() || s == "N/A" || s == "Unknown" || s == "None" {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .and_then(|dt| Utc.from_local_datetime(&dt).single())
}

/// Parse a duration in `[[days-]hours:]minutes:seconds[.fraction]` form.
///
/// Absent higher units are zero. CPU-time fields print fractions of a
/// second ("03:00.500"), wall-clock fields do not.
///
/// Returns None for "UNLIMITED", "Partition_Limit", empty strings and
/// anything with an unparseable component.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() || s == "UNLIMITED" || s == "Partition_Limit" || s == "INVALID" || s == "-" {
        return None;
    }

    let (days, time_part) = match s.split_once('-') {
        Some((d, rest)) => (d.parse::<u64>().ok()?, rest),
        None => (0, s),
    };

    let parts: Vec<&str> = time_part.split(':').collect();
    let (hours, minutes, seconds_part) = match parts.len() {
        3 => (
            parts[0].parse::<u64>().ok()?,
            parts[1].parse::<u64>().ok()?,
            parts[2],
        ),
        2 => (0, parts[0].parse::<u64>().ok()?, parts[1]),
        1 => (0, 0, parts[0]),
        _ => return None,
    };

    let seconds: f64 = seconds_part.parse().ok()?;
    if seconds < 0.0 {
        return None;
    }
    let whole = (days * 86400 + hours * 3600 + minutes * 60) as f64;
    Some(Duration::from_secs_f64(whole + seconds))
}

/// Format seconds in the scheduler's `D-HH:MM:SS` form, eliding zero days.
pub fn format_duration_hms(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    }
}
