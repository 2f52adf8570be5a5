//! Wall-clock helpers.
//!
//! Room deadlines are published to clients as Unix milliseconds; HTTP
//! responses carry RFC 3339 timestamps.

use chrono::{SecondsFormat, Utc};
use std::time::Duration;

/// Unix milliseconds.
pub type Millis = i64;

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> Millis {
    Utc::now().timestamp_millis()
}

/// `now + window` in Unix milliseconds.
pub fn deadline_after(now: Millis, window: Duration) -> Millis {
    now.saturating_add(window.as_millis() as Millis)
}

/// Current time as an RFC 3339 string with millisecond precision.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
