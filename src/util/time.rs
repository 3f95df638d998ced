//! Timing display helpers
//!
//! Kernel and phase timings are reported in milliseconds with two decimals;
//! very short spans fall back to microseconds so small partitions stay readable.

use std::time::Duration;

/// Duration as fractional milliseconds
#[inline]
pub fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Format a duration in human-readable form
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pardist::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5000.00ms");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else {
        format!("{:.2}ms", millis(duration))
    }
}

/// Format a speedup ratio, or a placeholder when it is undefined
pub fn format_speedup(speedup: Option<f64>) -> String {
    match speedup {
        Some(ratio) => format!("{:.2}x", ratio),
        None => "n/a".to_string(),
    }
}
