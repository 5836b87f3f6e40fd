//! Repository test double.

use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::{Entity, Record, Value};
use crate::repository::builder::Clause;
use crate::repository::{QueryContext, Repository};
use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};

/// Repository that touches no database.
///
/// Every call is appended to a journal shared by all clones, so a test can
/// assert on what the code under test asked for. Reads find nothing
/// (`first*` is `NotFound`, `find` is empty, `count` is zero) and writes
/// succeed.
#[derive(Debug, Clone, Default)]
pub struct NoopRepository {
    journal: Arc<Mutex<Vec<String>>>,
}

impl NoopRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructor shaped for `DatabaseManager`; the pool is ignored.
    pub fn from_pool(_pool: DbPool) -> Self {
        Self::default()
    }

    /// Calls recorded so far, oldest first.
    pub fn journal(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.into());
    }
}

impl Repository for NoopRepository {
    async fn with_transaction<F>(&self, f: F) -> DbResult<()>
    where
        F: FnOnce(Self) -> BoxFuture<'static, DbResult<()>> + Send + 'static,
    {
        self.record("with_transaction");
        f(self.clone()).await
    }

    fn with_context(&self, _ctx: QueryContext) -> Self {
        self.record("with_context");
        self.clone()
    }

    fn filter(self, clause: impl Into<String>, args: Vec<Value>) -> Self {
        self.record(format!("filter: {} {:?}", clause.into(), args));
        self
    }

    fn joins(self, clause: impl Into<String>, args: Vec<Value>) -> Self {
        self.record(format!("joins: {} {:?}", clause.into(), args));
        self
    }

    fn preload(self, association: impl Into<String>, conds: Vec<Clause>) -> Self {
        self.record(format!("preload: {} ({} conditions)", association.into(), conds.len()));
        self
    }

    fn order(self, order: impl Into<String>) -> Self {
        self.record(format!("order: {}", order.into()));
        self
    }

    fn id_equal(self, id: impl Into<Value>) -> Self {
        self.record(format!("id_equal: {:?}", id.into()));
        self
    }

    fn id_in(self, ids: Vec<Value>) -> Self {
        self.record(format!("id_in: {:?}", ids));
        self
    }

    fn is_active(self) -> Self {
        self.record("is_active");
        self
    }

    fn table(self, name: impl Into<String>, args: Vec<Value>) -> Self {
        self.record(format!("table: {} {:?}", name.into(), args));
        self
    }

    async fn first_by_id<T: Record>(self, id: impl Into<Value> + Send) -> DbResult<T> {
        self.record(format!("first_by_id: {:?}", id.into()));
        Err(DbError::not_found(T::table_name()))
    }

    async fn first<T: Record>(self, conds: Vec<Clause>) -> DbResult<T> {
        self.record(format!("first: {} conditions", conds.len()));
        Err(DbError::not_found(T::table_name()))
    }

    async fn find<T: Record>(self) -> DbResult<Vec<T>> {
        self.record("find");
        Ok(Vec::new())
    }

    async fn count(self) -> DbResult<i64> {
        self.record("count");
        Ok(0)
    }

    async fn create<E: Entity>(self, _entity: &E) -> DbResult<Option<i64>> {
        self.record(format!("create: {}", E::table_name()));
        Ok(None)
    }

    async fn update<E: Entity>(self, _entity: &E) -> DbResult<u64> {
        self.record(format!("update: {}", E::table_name()));
        Ok(0)
    }

    async fn delete<E: Entity>(self, _entity: &E) -> DbResult<u64> {
        self.record(format!("delete: {}", E::table_name()));
        Ok(0)
    }

    async fn exec(&self, sql: impl Into<String> + Send, args: Vec<Value>) -> DbResult<u64> {
        self.record(format!("exec: {} {:?}", sql.into(), args));
        Ok(0)
    }
}
