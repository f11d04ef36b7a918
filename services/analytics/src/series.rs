//! Daily time series

use std::collections::{HashMap, HashSet};
use types::{day_bucket_ms, DailyPoint, TimeWindow, MS_PER_DAY};

use crate::rows::EventRow;

/// One point per UTC day of the window; quiet days are zero-filled
pub fn daily_series<R: EventRow>(rows: &[R], window: TimeWindow) -> Vec<DailyPoint> {
    let mut buckets: HashMap<i64, (u64, HashSet<&str>)> = HashMap::new();

    for row in rows.iter().filter(|row| window.contains(row.timestamp_ms())) {
        let (events, visitors) = buckets.entry(day_bucket_ms(row.timestamp_ms())).or_default();
        *events += row.event_count();
        visitors.insert(row.visitor_id());
    }

    window
        .dates()
        .into_iter()
        .enumerate()
        .map(|(offset, date)| {
            let day = window.first_day + offset as i64 * MS_PER_DAY;
            let (events, visitors) = buckets
                .get(&day)
                .map(|(events, visitors)| (*events, visitors.len() as u64))
                .unwrap_or((0, 0));
            DailyPoint {
                date,
                events,
                visitors,
            }
        })
        .collect()
}
