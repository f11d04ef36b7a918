//! Aggregation pipeline requests and row decoding
//!
//! Pendo's aggregation endpoint takes a pipeline whose first stage names a
//! source (`guideEvents`, `featureEvents`, ...) with an optional day-range
//! time series. Rows come back under `results`.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use types::{day_bucket_ms, GuideEvent, TimeWindow, UsageEvent, UsageTarget};

use crate::parse::{parse_items, Parsed};

/// First pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    GuideEvents { guide_id: Option<String> },
    FeatureEvents { feature_id: Option<String> },
    PageEvents { page_id: Option<String> },
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::GuideEvents { .. } => "guideEvents",
            Source::FeatureEvents { .. } => "featureEvents",
            Source::PageEvents { .. } => "pageEvents",
        }
    }

    fn params(&self) -> Value {
        let scoped = |key: &str, id: &Option<String>| match id {
            Some(id) => json!({ key: id }),
            None => Value::Null,
        };

        match self {
            Source::GuideEvents { guide_id } => scoped("guideId", guide_id),
            Source::FeatureEvents { feature_id } => scoped("featureId", feature_id),
            Source::PageEvents { page_id } => scoped("pageId", page_id),
        }
    }

    pub fn usage(target: UsageTarget) -> Self {
        match target {
            UsageTarget::Feature => Source::FeatureEvents { feature_id: None },
            UsageTarget::Page => Source::PageEvents { page_id: None },
        }
    }
}

/// Body of `POST /api/v1/aggregation`
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    pub source: Source,
    pub window: Option<TimeWindow>,
    pub filter: Option<String>,
    pub request_id: Option<String>,
}

impl AggregationRequest {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            window: None,
            filter: None,
            request_id: None,
        }
    }

    /// Restrict the source to a whole-day window
    pub fn over(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Add a `filter` stage, e.g. `"numEvents > 0"`
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter = Some(expression.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn to_json(&self) -> Value {
        let mut source = Map::new();
        source.insert(self.source.name().to_string(), self.source.params());
        if let Some(window) = &self.window {
            source.insert(
                "timeSeries".to_string(),
                json!({
                    "period": "dayRange",
                    "first": window.first_day,
                    "count": window.days,
                }),
            );
        }

        let mut pipeline = vec![json!({ "source": source })];
        if let Some(filter) = &self.filter {
            pipeline.push(json!({ "filter": filter }));
        }

        let mut request = Map::new();
        if let Some(id) = &self.request_id {
            request.insert("requestId".to_string(), json!(id));
        }
        request.insert("pipeline".to_string(), Value::Array(pipeline));

        json!({
            "response": { "mimeType": "application/json" },
            "request": request,
        })
    }
}

/// Pull the row array out of an aggregation response
pub fn result_rows(response: Value) -> Option<Vec<Value>> {
    match response {
        Value::Array(rows) => Some(rows),
        Value::Object(mut body) => match body.remove("results") {
            Some(Value::Array(rows)) => Some(rows),
            Some(Value::Null) | None => Some(Vec::new()),
            Some(_) => None,
        },
        _ => None,
    }
}

pub fn parse_guide_events(rows: Vec<Value>) -> Parsed<GuideEvent> {
    let parsed = parse_items::<GuideEvent>(rows, "guide event");
    Parsed {
        items: parsed.items.into_iter().map(|(event, _)| event).collect(),
        skipped: parsed.skipped,
    }
}

/// Usage row as returned by `featureEvents` / `pageEvents`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageRow {
    #[serde(default)]
    feature_id: Option<String>,
    #[serde(default)]
    page_id: Option<String>,
    visitor_id: String,
    #[serde(default)]
    account_id: Option<String>,
    #[serde(alias = "browserTime")]
    day: i64,
    #[serde(default)]
    num_events: u64,
    #[serde(default)]
    num_minutes: u64,
    #[serde(default)]
    rage_click_count: u64,
    #[serde(default)]
    dead_click_count: u64,
    #[serde(default)]
    error_click_count: u64,
    #[serde(default)]
    u_turn_count: u64,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
}

impl UsageRow {
    fn into_event(self, target: UsageTarget) -> Option<UsageEvent> {
        let target_id = match target {
            UsageTarget::Feature => self.feature_id,
            UsageTarget::Page => self.page_id,
        }?;

        Some(UsageEvent {
            target_kind: target,
            target_id,
            visitor_id: self.visitor_id,
            account_id: self.account_id,
            day: day_bucket_ms(self.day),
            num_events: self.num_events,
            num_minutes: self.num_minutes,
            rage_clicks: self.rage_click_count,
            dead_clicks: self.dead_click_count,
            error_clicks: self.error_click_count,
            u_turns: self.u_turn_count,
            country: self.country,
            user_agent: self.user_agent,
        })
    }
}

/// Decode usage rows; rows missing the target id count as skipped
pub fn parse_usage_events(target: UsageTarget, rows: Vec<Value>) -> Parsed<UsageEvent> {
    let parsed = parse_items::<UsageRow>(rows, target.source());
    let mut skipped = parsed.skipped;
    let mut items = Vec::with_capacity(parsed.items.len());

    for (row, _) in parsed.items {
        match row.into_event(target) {
            Some(event) => items.push(event),
            None => skipped += 1,
        }
    }

    Parsed { items, skipped }
}
