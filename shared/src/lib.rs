//! Shared models and utilities for the StockMaster workspace.
//!
//! - `models`: mirrored catalog entities, rules, and work-item records
//! - `remote`: wire DTOs for the remote catalog admin API
//! - `util`: timestamps and snowflake IDs

pub mod models;
pub mod remote;
pub mod util;
