//! Geographic and device breakdowns

use std::collections::{BTreeMap, HashSet};
use types::{BreakdownEntry, DeviceType};

use crate::rate;
use crate::rows::EventRow;

/// Group key for rows without a country
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Events and distinct visitors per country
pub fn geographic_breakdown<R: EventRow>(rows: &[R]) -> Vec<BreakdownEntry> {
    breakdown(rows, |row| {
        row.country()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_COUNTRY)
            .to_string()
    })
}

/// Events and distinct visitors per device class
pub fn device_breakdown<R: EventRow>(rows: &[R]) -> Vec<BreakdownEntry> {
    breakdown(rows, |row| {
        DeviceType::from_user_agent(row.user_agent())
            .as_str()
            .to_string()
    })
}

/// Sorted by visitors desc, events desc, key asc
fn breakdown<R, F>(rows: &[R], key_of: F) -> Vec<BreakdownEntry>
where
    R: EventRow,
    F: Fn(&R) -> String,
{
    let mut groups: BTreeMap<String, (u64, HashSet<&str>)> = BTreeMap::new();
    let mut all_visitors: HashSet<&str> = HashSet::new();

    for row in rows {
        let (events, visitors) = groups.entry(key_of(row)).or_default();
        *events += row.event_count();
        visitors.insert(row.visitor_id());
        all_visitors.insert(row.visitor_id());
    }

    let total = all_visitors.len() as u64;
    let mut entries: Vec<BreakdownEntry> = groups
        .into_iter()
        .map(|(key, (events, visitors))| {
            let visitors = visitors.len() as u64;
            BreakdownEntry {
                key,
                events,
                visitors,
                share: rate(visitors, total),
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.visitors
            .cmp(&a.visitors)
            .then_with(|| b.events.cmp(&a.events))
            .then_with(|| a.key.cmp(&b.key))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{GuideEvent, GuideEventKind};

    fn event(visitor: &str, country: Option<&str>, ua: Option<&str>) -> GuideEvent {
        GuideEvent {
            guide_id: "g1".to_string(),
            guide_step_id: None,
            visitor_id: visitor.to_string(),
            account_id: None,
            kind: GuideEventKind::Seen,
            browser_time: 0,
            country: country.map(str::to_string),
            region: None,
            user_agent: ua.map(str::to_string),
        }
    }

    #[test]
    fn test_geographic_grouping_and_order() {
        let rows = vec![
            event("v1", Some("US"), None),
            event("v1", Some("US"), None),
            event("v2", Some("US"), None),
            event("v3", Some("DE"), None),
            event("v3", Some("DE"), None),
            event("v3", Some("DE"), None),
            event("v4", None, None),
            event("v5", Some(" "), None),
        ];

        let geo = geographic_breakdown(&rows);
        let keys: Vec<_> = geo.iter().map(|e| e.key.as_str()).collect();
        // US and Unknown both have 2 visitors; US has more events
        assert_eq!(keys, vec!["US", "Unknown", "DE"]);

        assert_eq!(geo[0].events, 3);
        assert_eq!(geo[0].visitors, 2);
        assert_eq!(geo[0].share, 2.0 / 5.0);
        assert_eq!(geo[2].events, 3);
        assert_eq!(geo[2].share, 1.0 / 5.0);
    }

    #[test]
    fn test_ties_sorted_by_key() {
        let rows = vec![event("v1", Some("FR"), None), event("v2", Some("BR"), None)];
        let keys: Vec<_> = geographic_breakdown(&rows)
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["BR", "FR"]);
    }

    #[test]
    fn test_device_breakdown() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148";
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";
        let rows = vec![
            event("v1", None, Some(mac)),
            event("v2", None, Some(mac)),
            event("v3", None, Some(iphone)),
            event("v4", None, None),
        ];

        let devices = device_breakdown(&rows);
        assert_eq!(devices[0].key, "desktop");
        assert_eq!(devices[0].visitors, 2);
        assert_eq!(devices[0].share, 0.5);
        let keys: Vec<_> = devices.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["desktop", "mobile", "unknown"]);
    }

    #[test]
    fn test_empty_rows() {
        let rows: Vec<GuideEvent> = Vec::new();
        assert!(geographic_breakdown(&rows).is_empty());
        assert!(device_breakdown(&rows).is_empty());
    }
}
