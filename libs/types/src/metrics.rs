//! Derived metrics served to the dashboard
//!
//! Rates are fractions in `[0, 1]`. The frontend formats them as percentages.

use crate::entities::GuideState;
use crate::time::TimeWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideMetrics {
    pub guide_id: String,
    pub guide_name: String,
    /// Number of `guideSeen` events
    pub total_views: u64,
    /// Distinct visitors with any event on the guide
    pub unique_viewers: u64,
    pub completed_visitors: u64,
    pub dismissed_visitors: u64,
    pub completion_rate: f64,
    pub dismiss_rate: f64,
    /// Epoch milliseconds of the newest event
    pub last_seen_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFunnelEntry {
    pub step_id: String,
    /// 1-based position in the guide
    pub position: usize,
    pub visitors: u64,
    /// Fraction of first-step visitors lost by this step
    pub drop_off: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrustrationMetrics {
    pub target_id: String,
    pub total_events: u64,
    pub rage_clicks: u64,
    pub dead_clicks: u64,
    pub error_clicks: u64,
    pub u_turns: u64,
    pub frustrated_events: u64,
    pub frustration_rate: f64,
    pub unique_visitors: u64,
    pub affected_visitors: u64,
}

/// One group of a geographic or device breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub key: String,
    pub events: u64,
    pub visitors: u64,
    /// Fraction of all distinct visitors that fall in this group
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub events: u64,
    pub visitors: u64,
}

/// Everything the guide detail view renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideReport {
    pub window: TimeWindow,
    pub metrics: GuideMetrics,
    pub funnel: Vec<StepFunnelEntry>,
    pub geography: Vec<BreakdownEntry>,
    pub devices: Vec<BreakdownEntry>,
    pub daily: Vec<DailyPoint>,
}

/// Everything the feature/page frustration view renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrustrationReport {
    pub window: TimeWindow,
    pub metrics: FrustrationMetrics,
    pub geography: Vec<BreakdownEntry>,
    pub devices: Vec<BreakdownEntry>,
    pub daily: Vec<DailyPoint>,
}

/// Catalog counts for the landing page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataOverview {
    pub guides: u64,
    pub features: u64,
    pub pages: u64,
    pub reports: u64,
    pub guides_by_state: BTreeMap<String, u64>,
    pub active_guides: u64,
    /// Epoch milliseconds of the last finished sync
    pub last_synced_at: Option<i64>,
}

impl DataOverview {
    pub fn record_guide_state(&mut self, state: GuideState, count: u64) {
        if state.is_active() {
            self.active_guides += count;
        }
        *self
            .guides_by_state
            .entry(state.as_str().to_string())
            .or_default() += count;
    }
}
