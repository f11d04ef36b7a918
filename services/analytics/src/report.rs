//! Dashboard report assembly

use tracing::debug;
use types::{FrustrationReport, Guide, GuideEvent, GuideReport, TimeWindow, UsageEvent};

use crate::breakdown::{device_breakdown, geographic_breakdown};
use crate::frustration::frustration_metrics;
use crate::guide::{guide_metrics, step_funnel};
use crate::series::daily_series;

/// Guide detail view restricted to `window`
pub fn guide_report(guide: &Guide, events: &[GuideEvent], window: TimeWindow) -> GuideReport {
    let events: Vec<GuideEvent> = events
        .iter()
        .filter(|e| e.guide_id == guide.id && window.contains(e.browser_time))
        .cloned()
        .collect();

    debug!(
        "Building guide report for {} over {} days from {} events",
        guide.id,
        window.days,
        events.len()
    );

    GuideReport {
        window,
        metrics: guide_metrics(guide, &events),
        funnel: step_funnel(guide, &events),
        geography: geographic_breakdown(&events),
        devices: device_breakdown(&events),
        daily: daily_series(&events, window),
    }
}

/// Feature or page frustration view restricted to `window`
pub fn frustration_report(
    target_id: &str,
    usage: &[UsageEvent],
    window: TimeWindow,
) -> FrustrationReport {
    let usage: Vec<UsageEvent> = usage
        .iter()
        .filter(|row| row.target_id == target_id && window.contains(row.day))
        .cloned()
        .collect();

    FrustrationReport {
        window,
        metrics: frustration_metrics(target_id, &usage),
        geography: geographic_breakdown(&usage),
        devices: device_breakdown(&usage),
        daily: daily_series(&usage, window),
    }
}
