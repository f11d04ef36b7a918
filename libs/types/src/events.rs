//! Raw event rows produced by aggregation queries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Guide interaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuideEventKind {
    #[serde(rename = "guideSeen")]
    Seen,
    #[serde(rename = "guideAdvanced")]
    Advanced,
    #[serde(rename = "guideDismissed")]
    Dismissed,
    #[serde(rename = "guideSnoozed")]
    Snoozed,
    #[serde(rename = "guideTimeout")]
    Timeout,
    #[serde(rename = "guideActivity")]
    Activity,
    #[serde(other)]
    Other,
}

impl GuideEventKind {
    /// Wire spelling, also used as the stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            GuideEventKind::Seen => "guideSeen",
            GuideEventKind::Advanced => "guideAdvanced",
            GuideEventKind::Dismissed => "guideDismissed",
            GuideEventKind::Snoozed => "guideSnoozed",
            GuideEventKind::Timeout => "guideTimeout",
            GuideEventKind::Activity => "guideActivity",
            GuideEventKind::Other => "other",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "guideSeen" => GuideEventKind::Seen,
            "guideAdvanced" => GuideEventKind::Advanced,
            "guideDismissed" => GuideEventKind::Dismissed,
            "guideSnoozed" => GuideEventKind::Snoozed,
            "guideTimeout" => GuideEventKind::Timeout,
            "guideActivity" => GuideEventKind::Activity,
            _ => GuideEventKind::Other,
        }
    }
}

/// One guide interaction from the `guideEvents` source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideEvent {
    pub guide_id: String,

    #[serde(default)]
    pub guide_step_id: Option<String>,

    pub visitor_id: String,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(rename = "type")]
    pub kind: GuideEventKind,

    /// Epoch milliseconds in the visitor's browser clock
    pub browser_time: i64,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Which catalog collection a usage row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageTarget {
    Feature,
    Page,
}

impl UsageTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageTarget::Feature => "feature",
            UsageTarget::Page => "page",
        }
    }

    /// Aggregation source name
    pub fn source(&self) -> &'static str {
        match self {
            UsageTarget::Feature => "featureEvents",
            UsageTarget::Page => "pageEvents",
        }
    }
}

impl fmt::Display for UsageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per visitor, per day usage of one feature or page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub target_kind: UsageTarget,
    pub target_id: String,
    pub visitor_id: String,
    pub account_id: Option<String>,
    /// Epoch milliseconds at UTC midnight
    pub day: i64,
    pub num_events: u64,
    pub num_minutes: u64,
    pub rage_clicks: u64,
    pub dead_clicks: u64,
    pub error_clicks: u64,
    pub u_turns: u64,
    pub country: Option<String>,
    pub user_agent: Option<String>,
}

impl UsageEvent {
    /// Sum of all frustration signals on this row
    pub fn frustration_signals(&self) -> u64 {
        self.rage_clicks + self.dead_clicks + self.error_clicks + self.u_turns
    }
}

/// Device class derived from a user-agent string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

impl DeviceType {
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        let ua = match user_agent.map(str::trim) {
            Some(ua) if !ua.is_empty() => ua.to_ascii_lowercase(),
            _ => return DeviceType::Unknown,
        };

        let android = ua.contains("android");
        if ua.contains("ipad") || ua.contains("tablet") || (android && !ua.contains("mobile")) {
            DeviceType::Tablet
        } else if ua.contains("mobi") || ua.contains("iphone") || android {
            DeviceType::Mobile
        } else {
            DeviceType::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Desktop => "desktop",
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
