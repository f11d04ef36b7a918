//! Guide completion and step funnel

use std::collections::HashSet;
use types::{Guide, GuideEvent, GuideEventKind, GuideMetrics, StepFunnelEntry};

use crate::rate;

/// Completion and dismissal figures for one guide
///
/// A visitor completed the guide when they advanced past its last step. When
/// the guide's steps are unknown, advancing any step counts.
pub fn guide_metrics(guide: &Guide, events: &[GuideEvent]) -> GuideMetrics {
    let last_step = guide.last_step_id();

    let mut total_views = 0;
    let mut viewers: HashSet<&str> = HashSet::new();
    let mut completed: HashSet<&str> = HashSet::new();
    let mut dismissed: HashSet<&str> = HashSet::new();
    let mut last_seen_at: Option<i64> = None;

    for event in events.iter().filter(|e| e.guide_id == guide.id) {
        viewers.insert(&event.visitor_id);
        last_seen_at = last_seen_at.max(Some(event.browser_time));

        match event.kind {
            GuideEventKind::Seen => total_views += 1,
            GuideEventKind::Advanced => {
                let on_last_step = match last_step {
                    Some(last) => event.guide_step_id.as_deref() == Some(last),
                    None => true,
                };
                if on_last_step {
                    completed.insert(&event.visitor_id);
                }
            }
            GuideEventKind::Dismissed => {
                dismissed.insert(&event.visitor_id);
            }
            _ => {}
        }
    }

    let unique_viewers = viewers.len() as u64;
    let completed_visitors = completed.len() as u64;
    let dismissed_visitors = dismissed.len() as u64;

    GuideMetrics {
        guide_id: guide.id.clone(),
        guide_name: guide.name.clone(),
        total_views,
        unique_viewers,
        completed_visitors,
        dismissed_visitors,
        completion_rate: rate(completed_visitors, unique_viewers),
        dismiss_rate: rate(dismissed_visitors, unique_viewers),
        last_seen_at,
    }
}

/// Distinct visitors reaching each step, in guide order
pub fn step_funnel(guide: &Guide, events: &[GuideEvent]) -> Vec<StepFunnelEntry> {
    let per_step: Vec<u64> = guide
        .steps
        .iter()
        .map(|step| {
            events
                .iter()
                .filter(|e| e.guide_id == guide.id)
                .filter(|e| e.guide_step_id.as_deref() == Some(step.id.as_str()))
                .map(|e| e.visitor_id.as_str())
                .collect::<HashSet<_>>()
                .len() as u64
        })
        .collect();

    let first = per_step.first().copied().unwrap_or(0);

    guide
        .steps
        .iter()
        .zip(per_step)
        .enumerate()
        .map(|(index, (step, visitors))| StepFunnelEntry {
            step_id: step.id.clone(),
            position: index + 1,
            visitors,
            drop_off: if first == 0 {
                0.0
            } else {
                1.0 - rate(visitors, first)
            },
        })
        .collect()
}
