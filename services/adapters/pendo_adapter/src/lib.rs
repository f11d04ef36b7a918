//! Pendo Adapter
//!
//! Read-only client for the Pendo v1 API. This adapter is the only component
//! that talks to Pendo; everything downstream works from the local store.
//!
//! Features:
//! - Catalog listing for guides, features, pages and reports
//! - Aggregation pipelines for guide events and feature/page usage
//! - Shared per-minute rate limit across all requests
//! - Retry with exponential backoff for transport errors, 429 and 5xx

pub mod aggregation;
pub mod client;
pub mod config;
pub mod error;
pub mod parse;
pub mod rate_limit;
pub mod retry;
pub mod status;

pub use aggregation::{AggregationRequest, Source};
pub use client::PendoClient;
pub use config::PendoAdapterConfig;
pub use error::{PendoError, Result};
pub use parse::{parse_items, Parsed};
pub use rate_limit::RateLimiter;
pub use retry::{with_retry, RetryPolicy};
pub use status::{ApiOverview, ApiStatus, EntitySummary};
