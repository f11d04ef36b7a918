//! Pulse Dashboard
//!
//! HTTP JSON API over the synced Pendo data. The chart frontend consumes
//! these endpoints; this crate renders nothing itself.

pub mod api;
pub mod error;
pub mod server;

pub use error::{DashboardError, Result};
pub use server::{routes, DashboardServer};
