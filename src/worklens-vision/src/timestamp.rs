//! Capture-timestamp parsing for screenshot filenames
//!
//! Screenshot keys embed a 17-digit UTC timestamp (YYYYMMDDHHMMSSmmm).
//! The full instant is used for chronological ordering; the fixed-offset
//! local clock string is what the artifacts carry.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Number of digits in the embedded timestamp.
const TIMESTAMP_DIGITS: usize = 17;

/// Extract the UTC capture instant from a screenshot filename.
///
/// Scans for the first run of 17 consecutive ASCII digits and decodes it
/// as YYYYMMDDHHMMSSmmm. Returns None when no such run exists or the
/// digits do not form a valid date/time.
pub fn capture_timestamp(filename: &str) -> Option<DateTime<Utc>> {
    let bytes = filename.as_bytes();
    let window = (0..bytes.len().checked_sub(TIMESTAMP_DIGITS - 1)?)
        .find(|&i| bytes[i..i + TIMESTAMP_DIGITS].iter().all(u8::is_ascii_digit))?;
    let digits = &filename[window..window + TIMESTAMP_DIGITS];

    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;
    let hour: u32 = digits[8..10].parse().ok()?;
    let minute: u32 = digits[10..12].parse().ok()?;
    let second: u32 = digits[12..14].parse().ok()?;
    let millisecond: u32 = digits[14..17].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_milli_opt(hour, minute, second, millisecond)
        .map(|naive| naive.and_utc())
}

/// Format a UTC instant as "HH:MM:SS" in a fixed local offset.
///
/// Returns None for an offset outside the representable range.
pub fn local_clock_time(
    utc: DateTime<Utc>,
    offset_hours: i32,
    offset_minutes: i32,
) -> Option<String> {
    let offset = FixedOffset::east_opt(offset_hours * 3600 + offset_minutes * 60)?;
    Some(utc.with_timezone(&offset).format("%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_embedded_timestamp() {
        let ts = capture_timestamp("20240115103000123_monitor1.jpg").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.minute(), 30);
        assert_eq!(ts.second(), 0);
        assert_eq!(ts.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn rejects_filenames_without_timestamp() {
        assert!(capture_timestamp("frame_10-30-00.jpg").is_none());
        assert!(capture_timestamp("screenshot.jpg").is_none());
        // 16 digits is not enough.
        assert!(capture_timestamp("2024011510300012.jpg").is_none());
    }

    #[test]
    fn rejects_invalid_calendar_values() {
        // Month 13.
        assert!(capture_timestamp("20241315103000123.jpg").is_none());
    }

    #[test]
    fn converts_to_fixed_local_offset() {
        let ts = capture_timestamp("20240115103000123.jpg").unwrap();
        assert_eq!(local_clock_time(ts, 5, 30), Some("16:00:00".to_string()));
        assert_eq!(local_clock_time(ts, 0, 0), Some("10:30:00".to_string()));
        assert_eq!(local_clock_time(ts, -5, 0), Some("05:30:00".to_string()));
    }

    #[test]
    fn local_clock_wraps_across_midnight() {
        let ts = capture_timestamp("20240115220000000.jpg").unwrap();
        assert_eq!(local_clock_time(ts, 5, 30), Some("03:30:00".to_string()));
    }
}
