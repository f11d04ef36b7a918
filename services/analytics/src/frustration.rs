//! Frustration signals on features and pages

use std::collections::HashSet;
use types::{FrustrationMetrics, UsageEvent};

use crate::rate;

/// Rage, dead and error clicks plus U-turns as a share of all events
pub fn frustration_metrics(target_id: &str, usage: &[UsageEvent]) -> FrustrationMetrics {
    let mut metrics = FrustrationMetrics {
        target_id: target_id.to_string(),
        total_events: 0,
        rage_clicks: 0,
        dead_clicks: 0,
        error_clicks: 0,
        u_turns: 0,
        frustrated_events: 0,
        frustration_rate: 0.0,
        unique_visitors: 0,
        affected_visitors: 0,
    };

    let mut visitors: HashSet<&str> = HashSet::new();
    let mut affected: HashSet<&str> = HashSet::new();

    for row in usage.iter().filter(|row| row.target_id == target_id) {
        metrics.total_events += row.num_events;
        metrics.rage_clicks += row.rage_clicks;
        metrics.dead_clicks += row.dead_clicks;
        metrics.error_clicks += row.error_clicks;
        metrics.u_turns += row.u_turns;

        visitors.insert(&row.visitor_id);
        if row.frustration_signals() > 0 {
            affected.insert(&row.visitor_id);
        }
    }

    metrics.frustrated_events =
        metrics.rage_clicks + metrics.dead_clicks + metrics.error_clicks + metrics.u_turns;
    metrics.frustration_rate = rate(metrics.frustrated_events, metrics.total_events);
    metrics.unique_visitors = visitors.len() as u64;
    metrics.affected_visitors = affected.len() as u64;
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::UsageTarget;

    fn row(visitor: &str, events: u64, rage: u64, dead: u64, error: u64, u_turns: u64) -> UsageEvent {
        UsageEvent {
            target_kind: UsageTarget::Feature,
            target_id: "f1".to_string(),
            visitor_id: visitor.to_string(),
            account_id: None,
            day: 0,
            num_events: events,
            num_minutes: 0,
            rage_clicks: rage,
            dead_clicks: dead,
            error_clicks: error,
            u_turns,
            country: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_frustration_rate() {
        let usage = vec![
            row("v1", 50, 2, 1, 0, 0),
            row("v2", 30, 0, 0, 1, 1),
            row("v3", 20, 0, 0, 0, 0),
        ];

        let metrics = frustration_metrics("f1", &usage);
        assert_eq!(metrics.total_events, 100);
        assert_eq!(metrics.frustrated_events, 5);
        assert_eq!(metrics.frustration_rate, 0.05);
        assert_eq!(metrics.unique_visitors, 3);
        assert_eq!(metrics.affected_visitors, 2);
        assert_eq!(metrics.rage_clicks, 2);
        assert_eq!(metrics.u_turns, 1);
    }

    #[test]
    fn test_rate_capped_when_signals_exceed_events() {
        let metrics = frustration_metrics("f1", &[row("v1", 2, 5, 0, 0, 0)]);
        assert_eq!(metrics.frustration_rate, 1.0);
    }

    #[test]
    fn test_no_usage() {
        let metrics = frustration_metrics("f1", &[]);
        assert_eq!(metrics.total_events, 0);
        assert_eq!(metrics.frustration_rate, 0.0);
        assert_eq!(metrics.unique_visitors, 0);
    }

    #[test]
    fn test_other_targets_ignored() {
        let mut other = row("v1", 10, 10, 0, 0, 0);
        other.target_id = "f2".to_string();
        let metrics = frustration_metrics("f1", &[other]);
        assert_eq!(metrics.total_events, 0);
    }
}
