//! Configuration for the Pendo adapter

use pulse_config::PendoSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendoAdapterConfig {
    /// Integration key sent as `X-Pendo-Integration-Key`
    pub api_key: String,

    /// API host, without trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Requests per minute across the whole client
    pub rate_limit_per_minute: u32,

    /// Attempts per request, including the first
    pub max_retries: u32,

    /// Backoff before the first retry, doubled each time
    pub retry_base_delay_ms: u64,

    pub user_agent: String,
}

impl Default for PendoAdapterConfig {
    fn default() -> Self {
        Self::from(&PendoSettings::default())
    }
}

impl From<&PendoSettings> for PendoAdapterConfig {
    fn from(settings: &PendoSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs,
            rate_limit_per_minute: settings.rate_limit_per_minute,
            max_retries: settings.max_retries,
            retry_base_delay_ms: settings.retry_base_delay_ms,
            user_agent: settings.user_agent.clone(),
        }
    }
}

impl PendoAdapterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..RetryPolicy::default()
        }
    }
}
