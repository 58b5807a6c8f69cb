//! Human-readable formatting for chart axes, tooltips and terminal views.
//!
//! Sizes and rates use binary (1024-based) units.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;

const BYTE_UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const RATE_UNITS: [&str; 5] = ["B/s", "KB/s", "MB/s", "GB/s", "TB/s"];

/// Label used when a timestamp cannot be parsed.
pub const UNKNOWN_TIME_LABEL: &str = "--:--:--";

fn scale(value: f64, decimals: usize, units: &[&str]) -> String {
    let mut scaled = value;
    let mut index = 0;
    while scaled.abs() >= 1024.0 && index < units.len() - 1 {
        scaled /= 1024.0;
        index += 1;
    }
    format!("{:.*} {}", decimals, scaled, units[index])
}

/// Formats a byte count, e.g. `1536` -> `"1.50 KB"`.
///
/// Zero renders as `"0 Bytes"` and non-finite input as `"N/A"`.
pub fn format_bytes(bytes: f64, decimals: usize) -> String {
    if !bytes.is_finite() {
        return "N/A".to_string();
    }
    if bytes == 0.0 {
        return "0 Bytes".to_string();
    }
    scale(bytes, decimals, &BYTE_UNITS)
}

/// Formats a transfer rate in bytes per second, e.g. `2048` -> `"2.00 KB/s"`.
pub fn format_speed(bytes_per_second: f64, decimals: usize) -> String {
    if !bytes_per_second.is_finite() {
        return "N/A".to_string();
    }
    if bytes_per_second == 0.0 {
        return "0 B/s".to_string();
    }
    scale(bytes_per_second, decimals, &RATE_UNITS)
}

/// Formats an ISO-8601 timestamp as `HH:MM:SS` in the local time zone.
pub fn time_label(updated_at: &str) -> String {
    time_label_in(updated_at, &Local)
}

/// Formats an ISO-8601 timestamp as `HH:MM:SS` in the given time zone.
///
/// Timestamps without an offset are taken as wall-clock time in `tz`.
pub fn time_label_in<Tz>(updated_at: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let trimmed = updated_at.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed.with_timezone(tz).format("%H:%M:%S").to_string();
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|local| local.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| UNKNOWN_TIME_LABEL.to_string())
}

/// Formats an uptime in seconds, e.g. `93784` -> `"1d 2h 3m 4s"`.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }
    parts.join(" ")
}

static OS_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)debian", "Debian"),
        (r"(?i)ubuntu", "Ubuntu"),
        (r"(?i)windows", "Windows"),
        (r"(?i)arch", "Arch"),
        (r"(?i)alpine", "Alpine"),
        (r"(?i)centos", "CentOS"),
        (r"(?i)fedora", "Fedora"),
        (r"(?i)red\s*hat", "RHEL"),
        (r"(?i)opensuse", "openSUSE"),
        (r"(?i)manjaro", "Manjaro"),
    ]
    .into_iter()
    .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|re| (re, name)))
    .collect()
});

/// Reduces a full OS description to a short distribution name.
pub fn format_os(os: &str) -> String {
    OS_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(os))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| {
            os.split(|c: char| c.is_whitespace() || c == '/')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}
