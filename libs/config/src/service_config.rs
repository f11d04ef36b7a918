//! Service Configuration Module
//!
//! Provides configuration loading and validation for Pulse services.
//! Supports loading from TOML files with environment overrides.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use types::EntityKind;

use crate::logging::LogFormat;

/// Prefix for environment overrides
const ENV_PREFIX: &str = "PULSE";

/// Main service configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pendo: PendoSettings,
    pub database: DatabaseSettings,
    pub sync: SyncSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

/// Pendo API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PendoSettings {
    /// Integration key sent as `X-Pendo-Integration-Key`
    pub api_key: String,

    /// Regional API host
    pub base_url: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Request budget shared by all calls
    pub rate_limit_per_minute: u32,

    /// Attempts per request, including the first
    pub max_retries: u32,

    /// First backoff delay, doubled on every retry
    pub retry_base_delay_ms: u64,

    pub user_agent: String,
}

impl Default for PendoSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://app.pendo.io".to_string(),
            timeout_secs: 15,
            rate_limit_per_minute: 300,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            user_agent: format!("pulse-sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/pulse.sqlite"),
        }
    }
}

/// Sync schedule and scope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Cron expression, 5-field or 6/7-field with seconds
    pub schedule: String,

    /// Run one sync immediately when the service starts
    pub run_on_start: bool,

    /// Days of event history fetched per sync
    pub lookback_days: u32,

    /// Catalog collections to sync
    pub entities: Vec<EntityKind>,

    /// Fetch guide, feature and page events
    pub sync_events: bool,

    /// Only fetch events for public guides
    pub active_guides_only: bool,

    /// Events older than this are pruned after each sync
    pub retention_days: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            schedule: "0 */6 * * *".to_string(),
            run_on_start: true,
            lookback_days: 30,
            entities: EntityKind::ALL.to_vec(),
            sync_events: true,
            active_guides_only: true,
            retention_days: 180,
        }
    }
}

/// Dashboard API server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env: Map<String, String> = std::env::vars().collect();
        Self::load_with_env(path, env)
    }

    /// Load configuration against an explicit environment map
    pub fn load_with_env(path: Option<&Path>, env: Map<String, String>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading configuration file: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (PULSE_ prefix)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        let mut config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.apply_legacy_env(&env);
        config.expand_env_vars(&env)?;

        debug!("Configuration resolved: {:?}", config.redacted());
        Ok(config)
    }

    /// Fall back to the variables the standalone client used
    fn apply_legacy_env(&mut self, env: &Map<String, String>) {
        if self.pendo.api_key.is_empty() {
            if let Some(key) = env.get("PENDO_API_KEY").filter(|k| !k.is_empty()) {
                self.pendo.api_key = key.clone();
            }
        }

        if let Some(url) = env.get("PENDO_BASE_URL").filter(|u| !u.is_empty()) {
            if self.pendo.base_url == PendoSettings::default().base_url {
                self.pendo.base_url = url.clone();
            }
        }
    }

    /// Expand `${VAR}` and `~` against `env` only
    pub fn expand_env_vars(&mut self, env: &Map<String, String>) -> Result<()> {
        let lookup = |name: &str| Ok::<_, Infallible>(env.get(name).map(String::as_str));
        let home = || env.get("HOME").cloned();

        self.pendo.api_key = shellexpand::env_with_context(&self.pendo.api_key, lookup)
            .context("Failed to expand API key")?
            .to_string();

        self.pendo.base_url = shellexpand::env_with_context(&self.pendo.base_url, lookup)
            .context("Failed to expand base URL")?
            .trim_end_matches('/')
            .to_string();

        let db_path = self.database.path.to_string_lossy().to_string();
        let expanded = shellexpand::full_with_context(&db_path, home, lookup)
            .context("Failed to expand database path")?;
        self.database.path = PathBuf::from(expanded.as_ref());

        Ok(())
    }

    /// Reject configurations the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pendo.api_key.trim().is_empty() {
            bail!("API key is required. Set PENDO_API_KEY or PULSE_PENDO__API_KEY");
        }

        if !self.pendo.base_url.starts_with("http://") && !self.pendo.base_url.starts_with("https://")
        {
            bail!("Pendo base URL must start with http:// or https://");
        }

        if self.pendo.rate_limit_per_minute == 0 {
            bail!("Rate limit must be greater than 0");
        }

        if self.pendo.max_retries == 0 {
            bail!("Max retries must be at least 1");
        }

        if self.sync.lookback_days == 0 {
            bail!("Lookback window must be at least one day");
        }

        if self.sync.entities.is_empty() {
            bail!("At least one entity kind must be synced");
        }

        if self.sync.schedule.trim().is_empty() {
            bail!("Sync schedule cannot be empty");
        }

        Ok(())
    }

    /// Copy safe to log: the API key is reduced to a prefix
    pub fn redacted(&self) -> AppConfig {
        let mut copy = self.clone();
        copy.pendo.api_key = mask_key(&self.pendo.api_key);
        copy
    }
}

/// First ten characters followed by `...`
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let prefix: String = key.chars().take(10).collect();
    format!("{}...", prefix)
}
