//! # Pulse Store
//!
//! SQLite-backed relational storage for everything the sync service pulls
//! from Pendo: the guide/feature/page/report catalog, raw guide events,
//! per-day feature and page usage rows, and the sync run ledger.
//!
//! The schema is plain relational tables (one per catalog kind plus event
//! and ledger tables) so it ports to any SQL server. Every batch write runs
//! in a single transaction.
//!
//! ```rust
//! use store::Store;
//! use types::EntityKind;
//!
//! let store = Store::in_memory().unwrap();
//! assert_eq!(store.count(EntityKind::Guide).unwrap(), 0);
//! ```

pub mod catalog;
pub mod error;
pub mod events;
pub mod runs;
mod schema;
mod store;

pub use error::{Result, StoreError};
pub use runs::{RunSummary, SyncOutcome, SyncRun, SyncTrigger};
pub use store::Store;
