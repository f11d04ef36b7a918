//! # Pulse Centralized Configuration
//!
//! Configuration loading for the Pulse sync and dashboard services.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults on every section
//! 2. Optional TOML file (`--config pulse.toml`)
//! 3. `PULSE_`-prefixed environment variables, `__` between path segments
//!    (`PULSE_PENDO__API_KEY`, `PULSE_SYNC__LOOKBACK_DAYS`)
//! 4. Bare `PENDO_API_KEY` / `PENDO_BASE_URL` when the above left them unset
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pulse_config::AppConfig;
//!
//! let config = AppConfig::load(None).unwrap();
//! config.validate().unwrap();
//! println!("syncing from {}", config.pendo.base_url);
//! ```

pub mod logging;
pub mod service_config;

pub use logging::{init_logging, LogFormat};
pub use service_config::{
    mask_key, AppConfig, DatabaseSettings, LoggingSettings, PendoSettings, ServerSettings,
    SyncSettings,
};
