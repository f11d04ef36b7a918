//! Connectivity and remote data summaries

use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::EntityKind;

/// Endpoints the client reads from
pub const READ_ENDPOINTS: [&str; 6] = [
    "/api/v1/guide",
    "/api/v1/feature",
    "/api/v1/page",
    "/api/v1/report",
    "/api/v1/metadata/schema/visitor",
    "/api/v1/metadata/schema/guide",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    pub connected: bool,
    pub base_url: String,
    /// First ten characters of the key followed by `...`
    pub api_key_prefix: Option<String>,
    pub working_endpoints: Vec<String>,
    pub capabilities: Vec<String>,
}

/// Count and first item of one remote collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySummary {
    pub kind: EntityKind,
    pub count: usize,
    pub sample: Option<Value>,
}

impl EntitySummary {
    pub fn from_items(kind: EntityKind, items: &[Value]) -> Self {
        Self {
            kind,
            count: items.len(),
            sample: items.first().cloned(),
        }
    }
}

/// What the remote account currently holds
///
/// A failure while listing is reported in `error` rather than raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOverview {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub entities: Vec<EntitySummary>,
    pub error: Option<String>,
}

impl ApiOverview {
    pub fn summary(&self, kind: EntityKind) -> Option<&EntitySummary> {
        self.entities.iter().find(|s| s.kind == kind)
    }
}
