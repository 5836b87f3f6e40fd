//! Database-specific transaction wrapper.
//!
//! A transaction holds a dedicated connection until it is committed or rolled
//! back. Repositories scoped to a transaction share it through
//! [`SharedTransaction`]; the slot is emptied when the scope ends so any clone
//! that outlives the scope fails instead of running outside the transaction.

use crate::error::{DbError, DbResult};
use crate::models::Driver;
use sqlx::{MySql, Postgres, Sqlite, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared, take-once slot for an open transaction.
pub type SharedTransaction = Arc<Mutex<Option<DbTransaction>>>;

pub enum DbTransaction {
    MySql(Transaction<'static, MySql>),
    Postgres(Transaction<'static, Postgres>),
    SQLite(Transaction<'static, Sqlite>),
}

impl std::fmt::Debug for DbTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DbTransaction").field(&self.driver()).finish()
    }
}

impl DbTransaction {
    /// Get the driver for this transaction.
    pub fn driver(&self) -> Driver {
        match self {
            DbTransaction::MySql(_) => Driver::MySql,
            DbTransaction::Postgres(_) => Driver::Postgres,
            DbTransaction::SQLite(_) => Driver::Sqlite,
        }
    }

    /// Commit the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self {
            DbTransaction::MySql(tx) => tx.commit().await.map_err(DbError::from),
            DbTransaction::Postgres(tx) => tx.commit().await.map_err(DbError::from),
            DbTransaction::SQLite(tx) => tx.commit().await.map_err(DbError::from),
        }
    }

    /// Rollback the transaction.
    pub async fn rollback(self) -> DbResult<()> {
        match self {
            DbTransaction::MySql(tx) => tx.rollback().await.map_err(DbError::from),
            DbTransaction::Postgres(tx) => tx.rollback().await.map_err(DbError::from),
            DbTransaction::SQLite(tx) => tx.rollback().await.map_err(DbError::from),
        }
    }

    /// Wrap into a shared slot.
    pub fn into_shared(self) -> SharedTransaction {
        Arc::new(Mutex::new(Some(self)))
    }
}

/// Take the transaction out of its slot, ending the scope for every clone.
pub async fn take(shared: &SharedTransaction) -> DbResult<DbTransaction> {
    shared
        .lock()
        .await
        .take()
        .ok_or_else(|| DbError::transaction("transaction scope has already ended"))
}
