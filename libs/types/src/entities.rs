//! Catalog entities returned by the Pendo list endpoints
//!
//! Only the fields the dashboard needs are typed. The full JSON document is
//! stored alongside each row by the store crate, so nothing is lost.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The four catalog collections that are synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "guides", alias = "guide")]
    Guide,
    #[serde(rename = "features", alias = "feature")]
    Feature,
    #[serde(rename = "pages", alias = "page")]
    Page,
    #[serde(rename = "reports", alias = "report")]
    Report,
}

impl EntityKind {
    /// All kinds in sync order
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Guide,
        EntityKind::Feature,
        EntityKind::Page,
        EntityKind::Report,
    ];

    /// List endpoint on the Pendo v1 API
    pub fn api_path(&self) -> &'static str {
        match self {
            EntityKind::Guide => "/api/v1/guide",
            EntityKind::Feature => "/api/v1/feature",
            EntityKind::Page => "/api/v1/page",
            EntityKind::Report => "/api/v1/report",
        }
    }

    /// Local table holding this kind
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Guide => "guides",
            EntityKind::Feature => "features",
            EntityKind::Page => "pages",
            EntityKind::Report => "reports",
        }
    }

    /// Plural label, also the config/CLI spelling
    pub fn label(&self) -> &'static str {
        self.table()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown entity kind: {0}")]
pub struct ParseEntityKindError(pub String);

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guide" | "guides" => Ok(EntityKind::Guide),
            "feature" | "features" => Ok(EntityKind::Feature),
            "page" | "pages" => Ok(EntityKind::Page),
            "report" | "reports" => Ok(EntityKind::Report),
            other => Err(ParseEntityKindError(other.to_string())),
        }
    }
}

/// Publication state of a guide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideState {
    Public,
    Staged,
    Draft,
    Disabled,
    Archived,
    #[default]
    #[serde(other)]
    Unknown,
}

impl GuideState {
    /// Only public guides are shown to visitors and produce events
    pub fn is_active(&self) -> bool {
        matches!(self, GuideState::Public)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GuideState::Public => "public",
            GuideState::Staged => "staged",
            GuideState::Draft => "draft",
            GuideState::Disabled => "disabled",
            GuideState::Archived => "archived",
            GuideState::Unknown => "unknown",
        }
    }

    /// Inverse of [`GuideState::as_str`]; unrecognised values map to `Unknown`
    pub fn from_db(value: &str) -> Self {
        match value {
            "public" => GuideState::Public,
            "staged" => GuideState::Staged,
            "draft" => GuideState::Draft,
            "disabled" => GuideState::Disabled,
            "archived" => GuideState::Archived,
            _ => GuideState::Unknown,
        }
    }
}

/// A single step of a guide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideStep {
    pub id: String,

    #[serde(default, rename = "type")]
    pub step_type: Option<String>,
}

/// Guide as returned by `GET /api/v1/guide`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub state: GuideState,

    #[serde(default)]
    pub launch_method: Option<String>,

    /// Pendo application id (numeric on the wire)
    #[serde(default)]
    pub app_id: Option<i64>,

    #[serde(default)]
    pub steps: Vec<GuideStep>,

    /// Epoch milliseconds
    #[serde(default)]
    pub created_at: Option<i64>,

    /// Epoch milliseconds
    #[serde(default)]
    pub last_updated_at: Option<i64>,
}

impl Guide {
    /// Id of the final step, if the guide has any steps
    pub fn last_step_id(&self) -> Option<&str> {
        self.steps.last().map(|step| step.id.as_str())
    }
}

/// Feature, page or report record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Pendo's own `kind` tag (e.g. "Feature", "Page")
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub app_id: Option<i64>,

    #[serde(default)]
    pub created_at: Option<i64>,

    #[serde(default)]
    pub last_updated_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_kind_parsing() {
        assert_eq!("guides".parse::<EntityKind>().unwrap(), EntityKind::Guide);
        assert_eq!("Feature".parse::<EntityKind>().unwrap(), EntityKind::Feature);
        assert_eq!(" pages ".parse::<EntityKind>().unwrap(), EntityKind::Page);
        assert!("visitors".parse::<EntityKind>().is_err());
        assert_eq!(EntityKind::Report.to_string(), "reports");
    }

    #[test]
    fn test_guide_deserialization_ignores_unknown_fields() {
        let guide: Guide = serde_json::from_value(json!({
            "id": "abc",
            "name": "Onboarding",
            "state": "public",
            "launchMethod": "auto",
            "appId": -323232,
            "isMultiStep": true,
            "steps": [{"id": "s1", "type": "lightbox"}, {"id": "s2"}],
            "createdAt": 1700000000000i64,
            "audience": [{"source": {"visitors": null}}]
        }))
        .unwrap();

        assert_eq!(guide.state, GuideState::Public);
        assert_eq!(guide.app_id, Some(-323232));
        assert_eq!(guide.last_step_id(), Some("s2"));
        assert_eq!(guide.steps.len(), 2);
        assert_eq!(guide.steps[0].step_type.as_deref(), Some("lightbox"));
    }

    #[test]
    fn test_unrecognised_guide_state() {
        let guide: Guide =
            serde_json::from_value(json!({"id": "x", "state": "_pendingReview_"})).unwrap();
        assert_eq!(guide.state, GuideState::Unknown);
        assert!(!guide.state.is_active());

        let missing: Guide = serde_json::from_value(json!({"id": "y"})).unwrap();
        assert_eq!(missing.state, GuideState::Unknown);
        assert!(missing.last_step_id().is_none());
    }

    #[test]
    fn test_guide_state_db_round_trip() {
        for state in [
            GuideState::Public,
            GuideState::Staged,
            GuideState::Draft,
            GuideState::Disabled,
            GuideState::Archived,
            GuideState::Unknown,
        ] {
            assert_eq!(GuideState::from_db(state.as_str()), state);
        }
    }
}
