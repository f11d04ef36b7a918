//! HTTP client for the Pendo v1 API

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use types::{now_ms, CatalogEntity, EntityKind, Guide, GuideEvent, TimeWindow, UsageEvent, UsageTarget};
use uuid::Uuid;

use crate::aggregation::{
    parse_guide_events, parse_usage_events, result_rows, AggregationRequest, Source,
};
use crate::config::PendoAdapterConfig;
use crate::error::{PendoError, Result};
use crate::parse::{parse_items, Parsed};
use crate::rate_limit::RateLimiter;
use crate::retry::{with_retry, RetryPolicy};
use crate::status::{ApiOverview, ApiStatus, EntitySummary, READ_ENDPOINTS};

const INTEGRATION_KEY_HEADER: &str = "x-pendo-integration-key";
const AGGREGATION_PATH: &str = "/api/v1/aggregation";

/// Read-only Pendo client
///
/// Cheap to clone; clones share the connection pool and the rate limit.
#[derive(Clone)]
pub struct PendoClient {
    http: Client,
    config: PendoAdapterConfig,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl PendoClient {
    pub fn new(config: PendoAdapterConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(PendoError::Configuration(
                "API key is required. Set PENDO_API_KEY or pendo.api_key".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(config.api_key.trim())
            .map_err(|e| PendoError::Configuration(format!("invalid API key header: {}", e)))?;
        key.set_sensitive(true);
        headers.insert(INTEGRATION_KEY_HEADER, key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .pool_max_idle_per_host(4)
            .build()?;

        let limiter = RateLimiter::per_minute(config.rate_limit_per_minute);
        let retry = config.retry_policy();

        info!(
            "Pendo client ready for {} ({} req/min, {} attempts)",
            config.base_url,
            limiter.requests_per_minute(),
            retry.max_attempts
        );

        Ok(Self {
            http,
            config,
            limiter,
            retry,
        })
    }

    /// Replace the retry policy (tests use millisecond delays)
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn send_once(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.limiter.wait().await;

        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response.text().await?;

        if !status.is_success() {
            return Err(PendoError::from_response(status.as_u16(), &text, retry_after));
        }

        debug!("{} {} -> {}", method, path, status);

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| PendoError::decode(path, e))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        with_retry(&self.retry, &format!("GET {}", path), move || {
            self.send_once(Method::GET, path, None)
        })
        .await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        with_retry(&self.retry, &format!("POST {}", path), move || {
            self.send_once(Method::POST, path, Some(body))
        })
        .await
    }

    /// Raw items of one catalog collection
    #[instrument(skip(self))]
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Value>> {
        match self.get(kind.api_path()).await? {
            Value::Array(items) => {
                debug!("Fetched {} {}", items.len(), kind);
                Ok(items)
            }
            Value::Null => Ok(Vec::new()),
            other => Err(PendoError::decode(
                kind.api_path(),
                format!("expected an array, got {}", json_type(&other)),
            )),
        }
    }

    pub async fn list_guides(&self) -> Result<Parsed<(Guide, Value)>> {
        let raw = self.list(EntityKind::Guide).await?;
        Ok(parse_items(raw, "guide"))
    }

    pub async fn list_features(&self) -> Result<Parsed<(CatalogEntity, Value)>> {
        let raw = self.list(EntityKind::Feature).await?;
        Ok(parse_items(raw, "feature"))
    }

    pub async fn list_pages(&self) -> Result<Parsed<(CatalogEntity, Value)>> {
        let raw = self.list(EntityKind::Page).await?;
        Ok(parse_items(raw, "page"))
    }

    pub async fn list_reports(&self) -> Result<Parsed<(CatalogEntity, Value)>> {
        let raw = self.list(EntityKind::Report).await?;
        Ok(parse_items(raw, "report"))
    }

    pub async fn guide_schema(&self) -> Result<Value> {
        self.get("/api/v1/metadata/schema/guide").await
    }

    pub async fn visitor_schema(&self) -> Result<Value> {
        self.get("/api/v1/metadata/schema/visitor").await
    }

    /// Run an aggregation pipeline and return its rows
    pub async fn aggregate(&self, request: &AggregationRequest) -> Result<Vec<Value>> {
        let request = match request.request_id {
            Some(_) => request.clone(),
            None => request.clone().with_request_id(Uuid::new_v4().to_string()),
        };

        let response = self.post(AGGREGATION_PATH, &request.to_json()).await?;
        let rows = result_rows(response).ok_or_else(|| {
            PendoError::decode(AGGREGATION_PATH, "response has no results array")
        })?;

        debug!(
            "Aggregation {} on {} returned {} rows",
            request.request_id.as_deref().unwrap_or("-"),
            request.source.name(),
            rows.len()
        );
        Ok(rows)
    }

    /// Guide events for one guide over the window
    pub async fn guide_events(&self, guide_id: &str, window: TimeWindow) -> Result<Parsed<GuideEvent>> {
        let request = AggregationRequest::new(Source::GuideEvents {
            guide_id: Some(guide_id.to_string()),
        })
        .over(window);

        let rows = self.aggregate(&request).await?;
        Ok(parse_guide_events(rows))
    }

    pub async fn feature_events(&self, window: TimeWindow) -> Result<Parsed<UsageEvent>> {
        self.usage_events(UsageTarget::Feature, window).await
    }

    pub async fn page_events(&self, window: TimeWindow) -> Result<Parsed<UsageEvent>> {
        self.usage_events(UsageTarget::Page, window).await
    }

    async fn usage_events(&self, target: UsageTarget, window: TimeWindow) -> Result<Parsed<UsageEvent>> {
        let request = AggregationRequest::new(Source::usage(target)).over(window);
        let rows = self.aggregate(&request).await?;
        Ok(parse_usage_events(target, rows))
    }

    /// True when the guide list endpoint answers
    pub async fn test_connection(&self) -> bool {
        match self.send_once(Method::GET, EntityKind::Guide.api_path(), None).await {
            Ok(_) => true,
            Err(e) => {
                error!("Pendo connection test failed: {}", e);
                false
            }
        }
    }

    pub async fn api_status(&self) -> ApiStatus {
        ApiStatus {
            connected: self.test_connection().await,
            base_url: self.config.base_url.clone(),
            api_key_prefix: Some(pulse_config::mask_key(&self.config.api_key))
                .filter(|k| !k.is_empty()),
            working_endpoints: READ_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            capabilities: [
                "Guide Management",
                "Feature Analytics",
                "Page Analytics",
                "Reporting",
                "Metadata Management",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }

    /// Per-collection counts with the first item of each as a sample
    pub async fn data_overview(&self) -> ApiOverview {
        let mut overview = ApiOverview {
            timestamp: now_ms(),
            ..Default::default()
        };

        for kind in EntityKind::ALL {
            match self.list(kind).await {
                Ok(items) => overview
                    .entities
                    .push(EntitySummary::from_items(kind, &items)),
                Err(e) => {
                    error!("Failed to get data overview: {}", e);
                    overview.error = Some(e.to_string());
                    break;
                }
            }
        }

        overview
    }
}

impl std::fmt::Debug for PendoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendoClient")
            .field("base_url", &self.config.base_url)
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .finish()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
