//! Human-readable elapsed time formatting
//!
//! Used for pass durations in logs and run summaries.

use std::time::Duration;

const SHORT_FORMAT_MAX: u64 = 100; // < 100s → X.XXs
const MEDIUM_FORMAT_MAX: u64 = 6000; // < 100m → M:SS.Xs
                                     // otherwise → H:MM:SS

/// Format an elapsed duration, choosing the format by magnitude
///
/// ```
/// use std::time::Duration;
/// use mbmap_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(Duration::from_millis(4500)), "4.50s");
/// assert_eq!(format_elapsed(Duration::from_secs(330)), "5:30.0s");
/// assert_eq!(format_elapsed(Duration::from_secs(6061)), "1:41:01");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.as_millis();

    // Sub-second digits are truncated so they never round up to a full unit
    if secs < SHORT_FORMAT_MAX {
        let centis = millis / 10;
        format!("{}.{:02}s", centis / 100, centis % 100)
    } else if secs < MEDIUM_FORMAT_MAX {
        let tenths = millis / 100;
        let minutes = tenths / 600;
        let rem = tenths % 600;
        format!("{}:{:02}.{}s", minutes, rem / 10, rem % 10)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}:{:02}:{:02}", hours, mins, secs % 60)
    }
}

/// Format a count with thousands separators (`12345678` → `12,345,678`)
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_format() {
        assert_eq!(format_elapsed(Duration::ZERO), "0.00s");
        assert_eq!(format_elapsed(Duration::from_millis(99_990)), "99.99s");
        assert_eq!(format_elapsed(Duration::from_millis(99_999)), "99.99s");
    }

    #[test]
    fn test_medium_format_boundary() {
        assert_eq!(format_elapsed(Duration::from_secs(100)), "1:40.0s");
        assert_eq!(format_elapsed(Duration::from_secs(5999)), "99:59.0s");
    }

    #[test]
    fn test_fraction_never_rounds_into_next_minute() {
        assert_eq!(format_elapsed(Duration::from_millis(5_999_960)), "99:59.9s");
        assert_eq!(format_elapsed(Duration::from_millis(119_999)), "1:59.9s");
    }

    #[test]
    fn test_long_format() {
        assert_eq!(format_elapsed(Duration::from_secs(6000)), "1:40:00");
        assert_eq!(format_elapsed(Duration::from_secs(6061)), "1:41:01");
        assert_eq!(format_elapsed(Duration::from_secs(90_061)), "25:01:01");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(12_345_678), "12,345,678");
    }
}
