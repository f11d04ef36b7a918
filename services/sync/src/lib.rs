//! # Sync Service
//!
//! Pulls the Pendo catalog and event data into the local store.
//!
//! - [`SyncEngine`] runs one fetch-and-upsert pass and refuses to overlap
//!   with another pass.
//! - [`Scheduler`] drives the engine from a cron expression until shutdown.

pub mod engine;
pub mod error;
pub mod scheduler;

pub use engine::{StageReport, SyncEngine, SyncReport, SyncStatus};
pub use error::{Result, SyncError};
pub use scheduler::Scheduler;
pub use store::{SyncOutcome, SyncTrigger};
