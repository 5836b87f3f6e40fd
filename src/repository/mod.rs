//! Repository interface over the open connection.
//!
//! A repository accumulates builder state through chainable calls
//! (`filter`, `joins`, `order`, ...) and executes it in a terminal call
//! (`first`, `find`, `count`, `create`, ...). Terminal calls consume the
//! repository, so each instance builds exactly one query; obtain a fresh one
//! from the manager, or through `with_context` / `with_transaction`.

pub mod builder;
pub mod context;
pub mod noop;
pub mod sql;

pub use builder::{Clause, Filter, Preload, QueryState};
pub use context::QueryContext;
pub use noop::NoopRepository;
pub use sql::SqlRepository;

use crate::error::DbResult;
use crate::models::{Entity, Record, Value};
use futures_util::future::BoxFuture;
use std::future::Future;

/// Chainable query builder bound to a connection or transaction.
pub trait Repository: Clone + Send + Sync + Sized + 'static {
    /// Run `f` against a transaction-scoped repository.
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise. Calling this on a
    /// repository that is already transaction-scoped reuses that transaction.
    fn with_transaction<F>(&self, f: F) -> impl Future<Output = DbResult<()>> + Send
    where
        F: FnOnce(Self) -> BoxFuture<'static, DbResult<()>> + Send + 'static;

    /// Copy of this repository whose calls honor `ctx`.
    fn with_context(&self, ctx: QueryContext) -> Self;

    /// Add a `WHERE` condition with `?` placeholders.
    fn filter(self, clause: impl Into<String>, args: Vec<Value>) -> Self;

    fn joins(self, clause: impl Into<String>, args: Vec<Value>) -> Self;

    /// Load `association` for every fetched row.
    fn preload(self, association: impl Into<String>, conds: Vec<Clause>) -> Self;

    fn order(self, order: impl Into<String>) -> Self;

    /// Primary key equals `id`.
    fn id_equal(self, id: impl Into<Value>) -> Self;

    /// Primary key is one of `ids`.
    fn id_in(self, ids: Vec<Value>) -> Self;

    /// `active IS TRUE`.
    fn is_active(self) -> Self;

    /// Query `name` instead of the model's table. May be a subquery with arguments.
    fn table(self, name: impl Into<String>, args: Vec<Value>) -> Self;

    /// Row whose primary key is `id`; `NotFound` when there is none.
    fn first_by_id<T: Record>(
        self,
        id: impl Into<Value> + Send,
    ) -> impl Future<Output = DbResult<T>> + Send;

    /// First row by primary key matching the accumulated filters and `conds`.
    fn first<T: Record>(self, conds: Vec<Clause>) -> impl Future<Output = DbResult<T>> + Send;

    fn find<T: Record>(self) -> impl Future<Output = DbResult<Vec<T>>> + Send;

    /// Number of matching rows in the table set with [`table`](Self::table).
    fn count(self) -> impl Future<Output = DbResult<i64>> + Send;

    /// Insert `entity`. Returns the generated key when the backend assigned one.
    fn create<E: Entity>(self, entity: &E) -> impl Future<Output = DbResult<Option<i64>>> + Send;

    /// Update the row with `entity`'s key. Returns the number of rows changed.
    fn update<E: Entity>(self, entity: &E) -> impl Future<Output = DbResult<u64>> + Send;

    /// Delete by `entity`'s key, by the accumulated filters, or both.
    fn delete<E: Entity>(self, entity: &E) -> impl Future<Output = DbResult<u64>> + Send;

    /// Run arbitrary SQL with `?` placeholders, bypassing the builder.
    fn exec(
        &self,
        sql: impl Into<String> + Send,
        args: Vec<Value>,
    ) -> impl Future<Output = DbResult<u64>> + Send;
}
