//! Model traits tying Rust types to tables.

use crate::error::{DbError, DbResult};
use crate::models::schema::{ColumnDef, SchemaDescriptor, table_name_for};
use crate::models::value::Value;
use crate::repository::{Preload, Repository};
use futures_util::future::BoxFuture;
use sqlx::FromRow;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;

/// A type backed by a table.
pub trait Model: Sized + Send {
    /// Defaults to the snake_case plural of the type name.
    fn table_name() -> String {
        table_name_for(std::any::type_name::<Self>())
    }

    fn primary_key() -> &'static str {
        "id"
    }

    fn columns() -> Vec<ColumnDef>;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new(Self::table_name(), Self::columns())
    }

    /// Load the association named by `preload` into already fetched rows.
    ///
    /// `repo` is a fresh repository bound to the same connection and context as
    /// the query that produced `rows`.
    fn load_association<'a, R: Repository>(
        rows: &'a mut [Self],
        preload: &'a Preload,
        repo: R,
    ) -> BoxFuture<'a, DbResult<()>> {
        let _ = (rows, repo);
        Box::pin(async move {
            Err(DbError::invalid_input(format!(
                "unknown association '{}' on '{}'",
                preload.name,
                Self::table_name()
            )))
        })
    }
}

/// A model that can be read from any supported backend.
pub trait Record:
    Model
    + Unpin
    + 'static
    + for<'r> FromRow<'r, PgRow>
    + for<'r> FromRow<'r, MySqlRow>
    + for<'r> FromRow<'r, SqliteRow>
{
}

impl<T> Record for T where
    T: Model
        + Unpin
        + 'static
        + for<'r> FromRow<'r, PgRow>
        + for<'r> FromRow<'r, MySqlRow>
        + for<'r> FromRow<'r, SqliteRow>
{
}

/// A model that can be written.
pub trait Entity: Model + Sync {
    /// Primary key value; a zero value means "not yet assigned".
    fn id(&self) -> Value;

    /// Non-key column values, in insert order.
    fn values(&self) -> Vec<(&'static str, Value)>;
}
