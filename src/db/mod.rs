//! Database layer.
//!
//! This module provides everything below the repository interface:
//! - Opening database-specific pools
//! - Statement rendering and execution
//! - Transactions shared by scoped repositories
//! - Auto-migration
//! - The query cache and the manager tying it together
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod executor;
pub mod manager;
pub mod migrate;
pub mod pool;
pub mod query_cache;
pub mod statement;
pub mod transaction;

pub use executor::ConnectionHandle;
pub use manager::{DatabaseManager, RepositoryCtor, SEED_THROTTLE};
pub use migrate::Migrator;
pub use pool::{DbPool, Dialector};
pub use query_cache::QueryCache;
pub use statement::{SqlWriter, Statement};
pub use transaction::{DbTransaction, SharedTransaction};
