use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::Serialize;

/// Clock and calendar strings for the display sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockReading {
    /// 24-hour "HH:MM:SS".
    pub time: String,
    /// "AM" or "PM".
    pub period: &'static str,
    /// "October 19, 2026".
    pub date: String,
    /// "Monday".
    pub day: String,
}

impl ClockReading {
    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = now.with_timezone(&offset);
        Self {
            time: local.format("%H:%M:%S").to_string(),
            period: if local.hour() >= 12 { "PM" } else { "AM" },
            date: local.format("%B %-d, %Y").to_string(),
            day: local.format("%A").to_string(),
        }
    }
}
