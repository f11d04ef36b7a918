//! Epoch-millisecond helpers

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const MS_PER_DAY: i64 = 86_400_000;

/// Current time in epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn ms_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Truncate a timestamp to its UTC midnight
pub fn day_bucket_ms(ms: i64) -> i64 {
    ms.div_euclid(MS_PER_DAY) * MS_PER_DAY
}

/// Start of a `days`-long window ending at the day containing `now_ms`
pub fn window_start_ms(now_ms: i64, days: u32) -> i64 {
    day_bucket_ms(now_ms) - (days.saturating_sub(1) as i64) * MS_PER_DAY
}

/// Whole-day window, `[first_day, first_day + days)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    /// Epoch milliseconds at UTC midnight
    pub first_day: i64,
    pub days: u32,
}

impl TimeWindow {
    /// Window of `days` days ending with today
    pub fn last_days(now_ms: i64, days: u32) -> Self {
        let days = days.max(1);
        Self {
            first_day: window_start_ms(now_ms, days),
            days,
        }
    }

    /// Exclusive end in epoch milliseconds
    pub fn end_ms(&self) -> i64 {
        self.first_day + self.days as i64 * MS_PER_DAY
    }

    pub fn contains(&self, ms: i64) -> bool {
        ms >= self.first_day && ms < self.end_ms()
    }

    /// UTC dates covered by the window, oldest first
    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..self.days as i64)
            .filter_map(|offset| ms_to_datetime(self.first_day + offset * MS_PER_DAY))
            .map(|dt| dt.date_naive())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bucket() {
        let noon = 1_700_000_000_000; // 2023-11-14T22:13:20Z
        let bucket = day_bucket_ms(noon);
        assert_eq!(bucket % MS_PER_DAY, 0);
        assert!(noon - bucket < MS_PER_DAY);
        assert_eq!(day_bucket_ms(-1), -MS_PER_DAY);
    }

    #[test]
    fn test_window_covers_today() {
        let now = 1_700_000_000_000;
        let window = TimeWindow::last_days(now, 7);
        assert!(window.contains(now));
        assert!(!window.contains(window.end_ms()));
        assert!(window.contains(window.first_day));
        assert_eq!(window.dates().len(), 7);
        assert_eq!(
            window.dates().last().copied(),
            ms_to_datetime(now).map(|dt| dt.date_naive())
        );
    }

    #[test]
    fn test_zero_day_window_is_one_day() {
        let window = TimeWindow::last_days(1_700_000_000_000, 0);
        assert_eq!(window.days, 1);
    }
}
