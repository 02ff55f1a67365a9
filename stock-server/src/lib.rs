//! StockMaster Server — inventory mirror + rule automation for merchant stores
//!
//! # Architecture
//!
//! The server mirrors each connected store's remote catalog (products,
//! variants, locations, inventory levels) into a local SQLite database,
//! watches stock totals, and applies time-delayed reversible actions (hide
//! a product, restore it later) driven by per-store business rules.
//!
//! # Module structure
//!
//! ```text
//! stock-server/src/
//! ├── core/          # config, shared state, background tasks
//! ├── db/            # pool, migrations, repositories
//! ├── shopify/       # remote catalog client + session discipline
//! ├── sync/          # catalog reconciliation engine + periodic worker
//! ├── rules/         # matcher, scheduler, application state machine
//! ├── poller/        # scheduled-work poller
//! ├── events/        # validated inbound event boundary
//! ├── notify/        # notification dispatcher boundary
//! └── utils/         # error types
//! ```

pub mod core;
pub mod db;
pub mod events;
pub mod notify;
pub mod poller;
pub mod rules;
pub mod shopify;
pub mod sync;
pub mod utils;

// Re-export common types
pub use crate::core::{BackgroundTasks, Config, ServerState, TaskKind};
pub use events::EventProcessor;
pub use poller::{PollStats, SchedulePoller};
pub use rules::{ApplyOutcome, RuleEngine, ScheduleResult};
pub use sync::{CatalogSyncWorker, SyncEngine, SyncOutcome};
pub use utils::{AppError, AppResult};
