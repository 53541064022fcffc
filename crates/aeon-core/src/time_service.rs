//! Wall-clock facts for the local time/date answer and response timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Substrings that route a message to the clock answer.
pub const TIME_KEYWORDS: &[&str] = &["time", "date", "today", "now"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeInfo {
    /// `HH:MM:SS`
    pub time: String,
    /// `Weekday, Month DD, YYYY`
    pub date: String,
    pub timezone: String,
    /// ISO-8601 / RFC 3339
    pub timestamp: String,
}

pub fn current_time_info() -> TimeInfo {
    time_info_at(Utc::now())
}

pub fn time_info_at(now: DateTime<Utc>) -> TimeInfo {
    TimeInfo {
        time: now.format("%H:%M:%S").to_string(),
        date: now.format("%A, %B %d, %Y").to_string(),
        timezone: "UTC".to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, true),
    }
}

/// Case-insensitive substring match against [`TIME_KEYWORDS`].
pub fn mentions_time(message: &str) -> bool {
    let lower = message.to_lowercase();
    TIME_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// The user-visible clock answer.
pub fn clock_answer(info: &TimeInfo) -> String {
    format!(
        "🕐 The current time is {} on {} ({}).",
        info.time, info.date, info.timezone
    )
}
