//! Database dispatch macros for reducing code duplication.
//!
//! This module provides declarative macros that generate database-specific
//! match arms while keeping each call site linear. The macros expand at
//! compile time with zero runtime overhead.

/// Macro for generating database dispatch match arms.
///
/// This macro generates match arms for `DbPool` variants, reducing the need
/// to manually write repetitive match statements.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     MySql(p) => do_mysql(p),
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

/// Run `$body` against a database-specific connection taken from a
/// `ConnectionHandle`.
///
/// `$conn` is bound to `&mut MySqlConnection`, `&mut PgConnection` or
/// `&mut SqliteConnection` and `$backend` to the matching executor submodule,
/// so the body is written once:
///
/// ```ignore
/// with_connection!(&self.handle, |conn, backend| backend::execute(conn, &stmt).await)
/// ```
///
/// Pool handles acquire a connection for the duration of the body;
/// transaction handles lock the shared transaction. Must be used inside a
/// function returning `DbResult`.
#[macro_export]
macro_rules! with_connection {
    ($handle:expr, |$conn:ident, $backend:ident| $body:expr) => {
        match $handle {
            $crate::db::executor::ConnectionHandle::Pool(pool) => match pool {
                $crate::db::pool::DbPool::MySql(p) => {
                    let mut pooled = p.acquire().await?;
                    let $conn: &mut ::sqlx::MySqlConnection = &mut *pooled;
                    use $crate::db::executor::mysql as $backend;
                    $body
                }
                $crate::db::pool::DbPool::Postgres(p) => {
                    let mut pooled = p.acquire().await?;
                    let $conn: &mut ::sqlx::PgConnection = &mut *pooled;
                    use $crate::db::executor::postgres as $backend;
                    $body
                }
                $crate::db::pool::DbPool::SQLite(p) => {
                    let mut pooled = p.acquire().await?;
                    let $conn: &mut ::sqlx::SqliteConnection = &mut *pooled;
                    use $crate::db::executor::sqlite as $backend;
                    $body
                }
            },
            $crate::db::executor::ConnectionHandle::Transaction { tx, .. } => {
                let mut guard = tx.lock().await;
                let active = guard.as_mut().ok_or_else(|| {
                    $crate::error::DbError::transaction("transaction scope has already ended")
                })?;
                match active {
                    $crate::db::transaction::DbTransaction::MySql(t) => {
                        let $conn: &mut ::sqlx::MySqlConnection = &mut **t;
                        use $crate::db::executor::mysql as $backend;
                        $body
                    }
                    $crate::db::transaction::DbTransaction::Postgres(t) => {
                        let $conn: &mut ::sqlx::PgConnection = &mut **t;
                        use $crate::db::executor::postgres as $backend;
                        $body
                    }
                    $crate::db::transaction::DbTransaction::SQLite(t) => {
                        let $conn: &mut ::sqlx::SqliteConnection = &mut **t;
                        use $crate::db::executor::sqlite as $backend;
                        $body
                    }
                }
            }
        }
    };
}

pub use impl_db_dispatch;
pub use with_connection;
