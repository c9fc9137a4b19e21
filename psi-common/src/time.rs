//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert whole seconds to a duration
pub fn secs_to_duration(secs: u64) -> std::time::Duration {
    std::time::Duration::from_secs(secs)
}

/// Format a `YYYYMMDD` date stamp as `YYYY/MM/DD`
///
/// Returns `None` when the stamp is not a valid calendar date.
pub fn format_date_stamp(stamp: &str) -> Option<String> {
    chrono::NaiveDate::parse_from_str(stamp, "%Y%m%d")
        .ok()
        .map(|date| date.format("%Y/%m/%d").to_string())
}
