use chrono::{Duration, Utc};

/// Current time as epoch milliseconds, the unit every wire timestamp uses.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Epoch millis `days` before `now`.
pub fn days_before(now: i64, days: u32) -> i64 {
    now - Duration::days(i64::from(days)).num_milliseconds()
}
