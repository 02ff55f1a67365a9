//! Catalog Reconciliation
//!
//! Full, paginated synchronization of the remote catalog into the local
//! mirror: products, variants, locations, and inventory levels, all
//! upserted by natural key so repeated runs converge.

pub mod engine;
pub mod worker;

pub use engine::{SyncEngine, SyncOutcome};
pub use worker::CatalogSyncWorker;
