//! Repository executing against a live pool or transaction.

use crate::db::executor::ConnectionHandle;
use crate::db::pool::DbPool;
use crate::db::statement::{SqlWriter, Statement};
use crate::db::transaction;
use crate::error::{DbError, DbResult};
use crate::models::{Driver, Entity, Model, Record, Value};
use crate::repository::builder::{Clause, Filter, Preload, QueryState};
use crate::repository::{QueryContext, Repository};
use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};

/// Production repository.
///
/// Cloning is cheap: the pool (or shared transaction) is reference counted and
/// the builder state is plain data.
#[derive(Debug, Clone)]
pub struct SqlRepository {
    handle: ConnectionHandle,
    ctx: QueryContext,
    state: QueryState,
}

impl SqlRepository {
    pub fn new(pool: DbPool) -> Self {
        Self {
            handle: ConnectionHandle::Pool(pool),
            ctx: QueryContext::default(),
            state: QueryState::default(),
        }
    }

    pub fn driver(&self) -> Driver {
        self.handle.driver()
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn is_transaction(&self) -> bool {
        self.handle.is_transaction()
    }

    /// The statement `find::<M>()` would run.
    pub fn to_sql<M: Model>(&self) -> DbResult<Statement> {
        self.state.select(
            self.driver(),
            &M::table_name(),
            M::primary_key(),
            &[],
            false,
        )
    }

    /// Same connection and context, empty builder state.
    fn fresh(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            ctx: self.ctx.clone(),
            state: QueryState::default(),
        }
    }

    async fn preload_into<T: Record>(&self, rows: &mut [T]) -> DbResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        for preload in &self.state.preloads {
            debug!(association = %preload.name, rows = rows.len(), "Preloading association");
            T::load_association(rows, preload, self.fresh()).await?;
        }
        Ok(())
    }
}

impl Repository for SqlRepository {
    async fn with_transaction<F>(&self, f: F) -> DbResult<()>
    where
        F: FnOnce(Self) -> BoxFuture<'static, DbResult<()>> + Send + 'static,
    {
        let pool = match &self.handle {
            ConnectionHandle::Transaction { .. } => {
                debug!("Reusing current transaction scope");
                return f(self.fresh()).await;
            }
            ConnectionHandle::Pool(pool) => pool.clone(),
        };

        let tx = self.ctx.run("begin transaction", pool.begin()).await?;
        let driver = tx.driver();
        let shared = tx.into_shared();
        debug!(driver = %driver, "Transaction started");

        let scoped = Self {
            handle: ConnectionHandle::Transaction {
                driver,
                tx: shared.clone(),
            },
            ctx: self.ctx.clone(),
            state: QueryState::default(),
        };
        let result = f(scoped).await;

        let tx = transaction::take(&shared).await?;
        match result {
            Ok(()) => {
                tx.commit().await?;
                debug!(driver = %driver, "Transaction committed");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Failed to roll back transaction");
                } else {
                    info!(driver = %driver, error = %e, "Transaction rolled back");
                }
                Err(e)
            }
        }
    }

    fn with_context(&self, ctx: QueryContext) -> Self {
        Self {
            ctx,
            ..self.clone()
        }
    }

    fn filter(mut self, clause: impl Into<String>, args: Vec<Value>) -> Self {
        self.state
            .filters
            .push(Filter::Raw(Clause::new(clause, args)));
        self
    }

    fn joins(mut self, clause: impl Into<String>, args: Vec<Value>) -> Self {
        self.state.joins.push(Clause::new(clause, args));
        self
    }

    fn preload(mut self, association: impl Into<String>, conds: Vec<Clause>) -> Self {
        self.state.preloads.push(Preload {
            name: association.into(),
            conds,
        });
        self
    }

    fn order(mut self, order: impl Into<String>) -> Self {
        self.state.orders.push(order.into());
        self
    }

    fn id_equal(mut self, id: impl Into<Value>) -> Self {
        self.state.filters.push(Filter::KeyEquals(id.into()));
        self
    }

    fn id_in(mut self, ids: Vec<Value>) -> Self {
        self.state.filters.push(Filter::KeyIn(ids));
        self
    }

    fn is_active(self) -> Self {
        self.filter("active IS TRUE", Vec::new())
    }

    fn table(mut self, name: impl Into<String>, args: Vec<Value>) -> Self {
        self.state.table = Some(Clause::new(name, args));
        self
    }

    async fn first_by_id<T: Record>(self, id: impl Into<Value> + Send) -> DbResult<T> {
        self.id_equal(id).first(Vec::new()).await
    }

    async fn first<T: Record>(self, conds: Vec<Clause>) -> DbResult<T> {
        let table = T::table_name();
        let stmt = self
            .state
            .select(self.driver(), &table, T::primary_key(), &conds, true)?;
        let row = self
            .ctx
            .run("first", self.handle.fetch_optional::<T>(&stmt))
            .await?
            .ok_or_else(|| DbError::not_found(self.state.table_name(&table)))?;

        let mut rows = [row];
        self.preload_into(&mut rows).await?;
        let [row] = rows;
        Ok(row)
    }

    async fn find<T: Record>(self) -> DbResult<Vec<T>> {
        let stmt = self.to_sql::<T>()?;
        let mut rows = self
            .ctx
            .run("find", self.handle.fetch_all::<T>(&stmt))
            .await?;
        self.preload_into(&mut rows).await?;
        Ok(rows)
    }

    async fn count(self) -> DbResult<i64> {
        let stmt = self.state.count(self.driver())?;
        self.ctx
            .run("count", self.handle.fetch_count(&stmt))
            .await
    }

    async fn create<E: Entity>(self, entity: &E) -> DbResult<Option<i64>> {
        let driver = self.driver();
        let id = entity.id();
        let generated = id.is_zero();

        let mut columns = Vec::new();
        if !generated {
            columns.push((E::primary_key(), id));
        }
        columns.extend(entity.values());

        // PostgreSQL only reports generated keys through RETURNING
        let returning = generated && driver == Driver::Postgres;
        let stmt = self.state.insert(
            driver,
            &E::table_name(),
            E::primary_key(),
            columns,
            returning,
        )?;

        let key = if returning {
            Some(
                self.ctx
                    .run("create", self.handle.fetch_count(&stmt))
                    .await?,
            )
        } else {
            let reported = self
                .ctx
                .run("create", self.handle.execute_insert(&stmt))
                .await?;
            reported.filter(|_| generated)
        };
        debug!(table = %E::table_name(), key = ?key, "Created record");
        Ok(key)
    }

    async fn update<E: Entity>(self, entity: &E) -> DbResult<u64> {
        let id = entity.id();
        if id.is_zero() {
            return Err(DbError::invalid_input(format!(
                "cannot update '{}' without a primary key value",
                E::table_name()
            )));
        }
        let stmt = self.state.update(
            self.driver(),
            &E::table_name(),
            E::primary_key(),
            id,
            entity.values(),
        )?;
        self.ctx.run("update", self.handle.execute(&stmt)).await
    }

    async fn delete<E: Entity>(self, entity: &E) -> DbResult<u64> {
        let id = entity.id();
        let id = (!id.is_zero()).then_some(id);
        let stmt = self
            .state
            .delete(self.driver(), &E::table_name(), E::primary_key(), id)?;
        self.ctx.run("delete", self.handle.execute(&stmt)).await
    }

    async fn exec(&self, sql: impl Into<String> + Send, args: Vec<Value>) -> DbResult<u64> {
        let sql = sql.into();
        let stmt = if args.is_empty() {
            Statement::raw(sql)
        } else {
            let mut writer = SqlWriter::new(self.driver());
            writer.push_clause(&sql, &args)?;
            writer.finish()
        };
        self.ctx.run("exec", self.handle.execute(&stmt)).await
    }
}
