//! dbfront
//!
//! A thin front layer over sqlx for SQLite, PostgreSQL and MySQL: driver
//! selection from an alias, named SQL files cached at startup, ordered seed
//! scripts, auto-migration of model schemas and a chainable repository.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;

pub use config::{Config, ConnectionOptions};
pub use db::{DatabaseManager, DbPool, QueryCache};
pub use error::{DbError, DbResult};
pub use models::{
    ColumnDef, ColumnType, DatabaseContext, Driver, Entity, LogLevel, Model, Record,
    SchemaDescriptor, Value,
};
pub use repository::{Clause, NoopRepository, QueryContext, Repository, SqlRepository};
