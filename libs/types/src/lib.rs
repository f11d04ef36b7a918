//! # Pulse Types Library
//!
//! Shared type system for the Pulse sync and metrics services.
//!
//! ## Contents
//!
//! - **Entities**: catalog records pulled from the Pendo v1 API (guides,
//!   features, pages, reports)
//! - **Events**: raw rows returned by aggregation queries (guide events and
//!   per-day feature/page usage with frustration signals)
//! - **Metrics**: derived values computed by the analytics crate and served
//!   by the dashboard API
//! - **Time**: epoch-millisecond helpers, since every Pendo timestamp is ms
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{EntityKind, Guide};
//!
//! let kind: EntityKind = "guides".parse().unwrap();
//! assert_eq!(kind.api_path(), "/api/v1/guide");
//!
//! let guide: Guide = serde_json::from_value(serde_json::json!({
//!     "id": "g1",
//!     "name": "Welcome tour",
//!     "state": "public",
//! }))
//! .unwrap();
//! assert!(guide.state.is_active());
//! ```

pub mod entities;
pub mod events;
pub mod metrics;
pub mod time;

pub use entities::{CatalogEntity, EntityKind, Guide, GuideState, GuideStep, ParseEntityKindError};
pub use events::{DeviceType, GuideEvent, GuideEventKind, UsageEvent, UsageTarget};
pub use metrics::{
    BreakdownEntry, DailyPoint, DataOverview, FrustrationMetrics, FrustrationReport, GuideMetrics,
    GuideReport, StepFunnelEntry,
};
pub use time::{day_bucket_ms, ms_to_datetime, now_ms, window_start_ms, TimeWindow, MS_PER_DAY};
