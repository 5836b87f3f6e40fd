//! Data models for dbfront.
//!
//! This module re-exports all model types used throughout the crate.

pub mod context;
pub mod entity;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use context::{DatabaseContext, Driver, LogLevel, SUPPORTED_DRIVERS};
pub use entity::{Entity, Model, Record};
pub use schema::{ColumnDef, ColumnType, SchemaDescriptor, table_name_for};
pub use value::Value;
