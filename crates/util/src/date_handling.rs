//! # Date Handling Utilities
//!
//! This module decides whether dashboard date values must be interpreted in
//! GMT and formats epoch-millisecond timestamps for display.

use chrono::{DateTime, Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Display format of formatted timestamps; sorts lexically in time order.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static GMT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(GMT|UTC)|\dZ$|[+-]00:?00$").expect("GMT marker pattern compiles")
});

/// Returns true if a date control value must be interpreted in GMT.
///
/// A value is GMT when it carries an explicit `GMT`/`UTC` marker or ends with
/// a zero UTC offset (`Z`, `+00:00`, `+0000`). Relative expressions such as
/// `-1h` carry no zone and are interpreted locally.
///
/// # Example
/// ```rust
/// use agtable_util::date_handling::is_gmt_value;
///
/// assert!(is_gmt_value("2023-01-01T00:00Z"));
/// assert!(is_gmt_value("01/05/2023 10:00:00 GMT"));
/// assert!(is_gmt_value("2023-01-01T00:00:00+00:00"));
///
/// assert!(!is_gmt_value("-1h"));
/// assert!(!is_gmt_value("2023-01-01T00:00:00+02:00"));
/// ```
pub fn is_gmt_value(value: &str) -> bool {
    GMT_MARKER.is_match(value.trim())
}

/// Formats an epoch-millisecond timestamp as `YYYY-MM-DD HH:MM:SS`.
///
/// When `gmt` is set the time is rendered in UTC and suffixed with ` GMT`,
/// otherwise it is rendered in the local time zone. Returns `None` for
/// timestamps outside the representable range.
///
/// # Example
/// ```rust
/// use agtable_util::date_handling::format_timestamp_millis;
///
/// assert_eq!(
///     format_timestamp_millis(1_672_531_200_000, true),
///     Some("2023-01-01 00:00:00 GMT".to_string())
/// );
/// ```
pub fn format_timestamp_millis(millis: i64, gmt: bool) -> Option<String> {
    let utc = DateTime::<Utc>::from_timestamp_millis(millis)?;
    if gmt {
        Some(format!("{} GMT", utc.format(DATETIME_FORMAT)))
    } else {
        Some(utc.with_timezone(&Local).format(DATETIME_FORMAT).to_string())
    }
}
