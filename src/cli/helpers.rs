//! Shared helpers for CLI commands.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Compact time format accepted for `--from` and `--to`.
const COMPACT_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Parse a time given on the command line, as RFC 3339 or `YYYYMMDDhhmmss` (UTC).
pub fn parse_time_arg(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, COMPACT_TIME_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|_| {
            format!(
                "invalid time '{}': expected RFC 3339 or YYYYMMDDhhmmss",
                s
            )
        })
}

/// Format an optional time for display.
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_time_arg() {
        let expected = Utc.with_ymd_and_hms(2023, 1, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_time_arg("20230101123000").unwrap(), expected);
        assert_eq!(parse_time_arg("2023-01-01T12:30:00Z").unwrap(), expected);
        assert_eq!(parse_time_arg("2023-01-01T13:30:00+01:00").unwrap(), expected);
        assert!(parse_time_arg("yesterday").is_err());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(None), "never");
        let t = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 5).unwrap();
        assert_eq!(format_time(Some(t)), "2023-01-01 00:00:05 UTC");
    }
}
