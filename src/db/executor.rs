//! Statement execution.
//!
//! This module runs rendered [`Statement`]s against either a pool or an open
//! transaction, with support for:
//! - Parameterized statements (owned values bound per backend)
//! - Raw, multi-statement SQL when there are no parameters
//! - Typed row decoding through `sqlx::FromRow`
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific execution and binding
//! - `postgres`: PostgreSQL-specific execution and binding
//! - `sqlite`: SQLite-specific execution and binding
//!
//! Each submodule provides identical functionality adapted to the database's type
//! system; [`with_connection!`](crate::with_connection) picks one per call.

use crate::db::pool::DbPool;
use crate::db::statement::Statement;
use crate::db::transaction::SharedTransaction;
use crate::error::{DbError, DbResult};
use crate::models::{Driver, Record, Value};
use tracing::debug;

/// What a repository executes against.
#[derive(Debug, Clone)]
pub enum ConnectionHandle {
    Pool(DbPool),
    Transaction { driver: Driver, tx: SharedTransaction },
}

impl ConnectionHandle {
    pub fn driver(&self) -> Driver {
        match self {
            ConnectionHandle::Pool(pool) => pool.driver(),
            ConnectionHandle::Transaction { driver, .. } => *driver,
        }
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self, ConnectionHandle::Transaction { .. })
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&self, stmt: &Statement) -> DbResult<u64> {
        debug!(
            sql = %stmt.sql,
            params = stmt.params.len(),
            transaction = self.is_transaction(),
            "Executing statement"
        );
        with_connection!(self, |conn, backend| backend::execute(conn, stmt).await)
    }

    /// Execute an INSERT and return the key the backend generated, if it reports one.
    ///
    /// PostgreSQL reports nothing here; use `RETURNING` with [`fetch_count`](Self::fetch_count).
    pub async fn execute_insert(&self, stmt: &Statement) -> DbResult<Option<i64>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing insert");
        with_connection!(self, |conn, backend| backend::execute_insert(conn, stmt).await)
    }

    /// Fetch all rows decoded as `T`.
    pub async fn fetch_all<T: Record>(&self, stmt: &Statement) -> DbResult<Vec<T>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Fetching rows");
        with_connection!(self, |conn, backend| backend::fetch_all::<T>(conn, stmt).await)
    }

    /// Fetch at most one row decoded as `T`.
    pub async fn fetch_optional<T: Record>(&self, stmt: &Statement) -> DbResult<Option<T>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Fetching row");
        with_connection!(self, |conn, backend| backend::fetch_optional::<T>(conn, stmt).await)
    }

    /// Fetch a single integer, e.g. `COUNT(*)`.
    pub async fn fetch_count(&self, stmt: &Statement) -> DbResult<i64> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Fetching count");
        with_connection!(self, |conn, backend| backend::fetch_count(conn, stmt).await)
    }

    /// Fetch the first column of every row as text.
    pub async fn fetch_strings(&self, stmt: &Statement) -> DbResult<Vec<String>> {
        with_connection!(self, |conn, backend| backend::fetch_strings(conn, stmt).await)
    }
}

fn bind_error(param: &Value, err: sqlx::error::BoxDynError) -> DbError {
    DbError::invalid_input(format!(
        "failed to bind {} parameter: {}",
        param.type_name(),
        err
    ))
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.
// Statements built by `SqlWriter` inline NULL, so the `Value::Null` arms only
// see hand-built statements.

pub(crate) mod mysql {
    use super::*;
    use sqlx::mysql::MySqlArguments;
    use sqlx::types::Json;
    use sqlx::{Arguments, MySql, MySqlConnection};

    fn arguments(params: &[Value]) -> DbResult<MySqlArguments> {
        let mut args = MySqlArguments::default();
        for param in params {
            let result = match param {
                Value::Null => args.add(None::<String>),
                Value::Bool(v) => args.add(*v),
                Value::Int(v) => args.add(*v),
                Value::Float(v) => args.add(*v),
                Value::Text(v) => args.add(v.clone()),
                Value::Bytes(v) => args.add(v.clone()),
                Value::Timestamp(v) => args.add(*v),
                Value::Json(v) => args.add(Json(v.clone())),
                Value::List(_) => args.add(Json(param.to_json())),
            };
            result.map_err(|e| bind_error(param, e))?;
        }
        Ok(args)
    }

    pub async fn execute(conn: &mut MySqlConnection, stmt: &Statement) -> DbResult<u64> {
        // When params is empty, execute raw SQL directly to avoid prepared statement issues
        // (some SQL like CREATE PROCEDURE doesn't support prepared statements)
        let result = if stmt.params.is_empty() {
            sqlx::Executor::execute(conn, stmt.sql.as_str()).await?
        } else {
            sqlx::query_with::<MySql, _>(&stmt.sql, arguments(&stmt.params)?)
                .execute(conn)
                .await?
        };
        Ok(result.rows_affected())
    }

    pub async fn execute_insert(
        conn: &mut MySqlConnection,
        stmt: &Statement,
    ) -> DbResult<Option<i64>> {
        let result = sqlx::query_with::<MySql, _>(&stmt.sql, arguments(&stmt.params)?)
            .execute(conn)
            .await?;
        Ok(match result.last_insert_id() {
            0 => None,
            id => i64::try_from(id).ok(),
        })
    }

    pub async fn fetch_all<T: Record>(
        conn: &mut MySqlConnection,
        stmt: &Statement,
    ) -> DbResult<Vec<T>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_as_with::<MySql, T, _>(&stmt.sql, args)
            .fetch_all(conn)
            .await?)
    }

    pub async fn fetch_optional<T: Record>(
        conn: &mut MySqlConnection,
        stmt: &Statement,
    ) -> DbResult<Option<T>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_as_with::<MySql, T, _>(&stmt.sql, args)
            .fetch_optional(conn)
            .await?)
    }

    pub async fn fetch_count(conn: &mut MySqlConnection, stmt: &Statement) -> DbResult<i64> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_scalar_with::<MySql, i64, _>(&stmt.sql, args)
            .fetch_one(conn)
            .await?)
    }

    pub async fn fetch_strings(
        conn: &mut MySqlConnection,
        stmt: &Statement,
    ) -> DbResult<Vec<String>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_scalar_with::<MySql, String, _>(&stmt.sql, args)
            .fetch_all(conn)
            .await?)
    }
}

pub(crate) mod postgres {
    use super::*;
    use sqlx::postgres::PgArguments;
    use sqlx::types::Json;
    use sqlx::{Arguments, PgConnection, Postgres};

    fn arguments(params: &[Value]) -> DbResult<PgArguments> {
        let mut args = PgArguments::default();
        for param in params {
            let result = match param {
                Value::Null => args.add(None::<String>),
                Value::Bool(v) => args.add(*v),
                Value::Int(v) => args.add(*v),
                Value::Float(v) => args.add(*v),
                Value::Text(v) => args.add(v.clone()),
                Value::Bytes(v) => args.add(v.clone()),
                Value::Timestamp(v) => args.add(*v),
                Value::Json(v) => args.add(Json(v.clone())),
                Value::List(_) => args.add(Json(param.to_json())),
            };
            result.map_err(|e| bind_error(param, e))?;
        }
        Ok(args)
    }

    pub async fn execute(conn: &mut PgConnection, stmt: &Statement) -> DbResult<u64> {
        let result = if stmt.params.is_empty() {
            sqlx::Executor::execute(conn, stmt.sql.as_str()).await?
        } else {
            sqlx::query_with::<Postgres, _>(&stmt.sql, arguments(&stmt.params)?)
                .execute(conn)
                .await?
        };
        Ok(result.rows_affected())
    }

    pub async fn execute_insert(conn: &mut PgConnection, stmt: &Statement) -> DbResult<Option<i64>> {
        execute(conn, stmt).await?;
        Ok(None)
    }

    pub async fn fetch_all<T: Record>(
        conn: &mut PgConnection,
        stmt: &Statement,
    ) -> DbResult<Vec<T>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_as_with::<Postgres, T, _>(&stmt.sql, args)
            .fetch_all(conn)
            .await?)
    }

    pub async fn fetch_optional<T: Record>(
        conn: &mut PgConnection,
        stmt: &Statement,
    ) -> DbResult<Option<T>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_as_with::<Postgres, T, _>(&stmt.sql, args)
            .fetch_optional(conn)
            .await?)
    }

    pub async fn fetch_count(conn: &mut PgConnection, stmt: &Statement) -> DbResult<i64> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_scalar_with::<Postgres, i64, _>(&stmt.sql, args)
            .fetch_one(conn)
            .await?)
    }

    pub async fn fetch_strings(conn: &mut PgConnection, stmt: &Statement) -> DbResult<Vec<String>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_scalar_with::<Postgres, String, _>(&stmt.sql, args)
            .fetch_all(conn)
            .await?)
    }
}

pub(crate) mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteArguments;
    use sqlx::{Arguments, Sqlite, SqliteConnection};

    fn arguments(params: &[Value]) -> DbResult<SqliteArguments<'static>> {
        let mut args = SqliteArguments::default();
        for param in params {
            let result = match param {
                Value::Null => args.add(None::<String>),
                Value::Bool(v) => args.add(*v),
                Value::Int(v) => args.add(*v),
                Value::Float(v) => args.add(*v),
                Value::Text(v) => args.add(v.clone()),
                Value::Bytes(v) => args.add(v.clone()),
                Value::Timestamp(v) => args.add(*v),
                // SQLite doesn't have native JSON type, store as string
                Value::Json(v) => args.add(v.to_string()),
                Value::List(_) => args.add(param.to_json().to_string()),
            };
            result.map_err(|e| bind_error(param, e))?;
        }
        Ok(args)
    }

    pub async fn execute(conn: &mut SqliteConnection, stmt: &Statement) -> DbResult<u64> {
        let result = if stmt.params.is_empty() {
            sqlx::Executor::execute(conn, stmt.sql.as_str()).await?
        } else {
            sqlx::query_with::<Sqlite, _>(&stmt.sql, arguments(&stmt.params)?)
                .execute(conn)
                .await?
        };
        Ok(result.rows_affected())
    }

    pub async fn execute_insert(
        conn: &mut SqliteConnection,
        stmt: &Statement,
    ) -> DbResult<Option<i64>> {
        let result = sqlx::query_with::<Sqlite, _>(&stmt.sql, arguments(&stmt.params)?)
            .execute(conn)
            .await?;
        Ok(Some(result.last_insert_rowid()))
    }

    pub async fn fetch_all<T: Record>(
        conn: &mut SqliteConnection,
        stmt: &Statement,
    ) -> DbResult<Vec<T>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_as_with::<Sqlite, T, _>(&stmt.sql, args)
            .fetch_all(conn)
            .await?)
    }

    pub async fn fetch_optional<T: Record>(
        conn: &mut SqliteConnection,
        stmt: &Statement,
    ) -> DbResult<Option<T>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_as_with::<Sqlite, T, _>(&stmt.sql, args)
            .fetch_optional(conn)
            .await?)
    }

    pub async fn fetch_count(conn: &mut SqliteConnection, stmt: &Statement) -> DbResult<i64> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_scalar_with::<Sqlite, i64, _>(&stmt.sql, args)
            .fetch_one(conn)
            .await?)
    }

    pub async fn fetch_strings(
        conn: &mut SqliteConnection,
        stmt: &Statement,
    ) -> DbResult<Vec<String>> {
        let args = arguments(&stmt.params)?;
        Ok(sqlx::query_scalar_with::<Sqlite, String, _>(&stmt.sql, args)
            .fetch_all(conn)
            .await?)
    }
}
