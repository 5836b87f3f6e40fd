//! Automatic schema reconciliation.
//!
//! Each [`SchemaDescriptor`] is compared against the live catalog:
//! a missing table is created, an existing table gains the columns it lacks.
//! Existing columns are never altered or dropped.
//!
//! # Architecture
//!
//! Catalog queries are organized in the `queries` submodule with one constant
//! per database type. Everything else goes through the shared executor.

use crate::db::executor::ConnectionHandle;
use crate::db::pool::DbPool;
use crate::db::statement::{SqlWriter, Statement};
use crate::error::DbResult;
use crate::models::{Driver, SchemaDescriptor, Value};
use tracing::{debug, info};

/// Schema migrator bound to a pool.
pub struct Migrator {
    handle: ConnectionHandle,
}

impl Migrator {
    pub fn new(pool: &DbPool) -> Self {
        Self {
            handle: ConnectionHandle::Pool(pool.clone()),
        }
    }

    /// Reconcile every descriptor, in order. Stops at the first failure.
    pub async fn auto_migrate(&self, models: &[SchemaDescriptor]) -> DbResult<()> {
        for model in models {
            self.migrate_one(model).await?;
        }
        Ok(())
    }

    async fn migrate_one(&self, model: &SchemaDescriptor) -> DbResult<()> {
        let driver = self.handle.driver();
        let existing = self.existing_columns(&model.table).await?;

        if existing.is_empty() {
            info!(table = %model.table, columns = model.columns.len(), "Creating table");
            self.handle
                .execute(&Statement::raw(model.create_table_sql(driver)))
                .await?;
            return Ok(());
        }

        for column in missing_columns(model, &existing) {
            info!(table = %model.table, column = %column.name, "Adding column");
            self.handle
                .execute(&Statement::raw(model.add_column_sql(driver, column)))
                .await?;
        }
        debug!(table = %model.table, "Table up to date");
        Ok(())
    }

    /// Column names of `table`; empty when the table does not exist.
    pub async fn existing_columns(&self, table: &str) -> DbResult<Vec<String>> {
        let driver = self.handle.driver();
        let mut writer = SqlWriter::new(driver);
        writer.push_clause(queries::columns(driver), &[Value::from(table)])?;
        self.handle.fetch_strings(&writer.finish()).await
    }
}

/// Non-key columns of `model` absent from `existing`.
fn missing_columns<'a>(
    model: &'a SchemaDescriptor,
    existing: &[String],
) -> Vec<&'a crate::models::ColumnDef> {
    model
        .columns
        .iter()
        .filter(|c| !c.primary_key)
        .filter(|c| !existing.iter().any(|e| e.eq_ignore_ascii_case(&c.name)))
        .collect()
}

mod queries {
    use super::Driver;

    pub fn columns(driver: Driver) -> &'static str {
        match driver {
            Driver::Postgres => postgres::COLUMNS,
            Driver::MySql => mysql::COLUMNS,
            Driver::Sqlite => sqlite::COLUMNS,
        }
    }

    pub mod postgres {
        pub const COLUMNS: &str = r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = ?
            ORDER BY ordinal_position
        "#;
    }

    pub mod mysql {
        pub const COLUMNS: &str = r#"
            SELECT CONVERT(COLUMN_NAME USING utf8mb4)
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;
    }

    pub mod sqlite {
        pub const COLUMNS: &str = "SELECT name FROM pragma_table_info(?)";
    }
}
