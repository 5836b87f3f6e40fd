//! Top-level database front: connection, cached queries, seeds, repositories.

use crate::config::ConnectionOptions;
use crate::db::executor::ConnectionHandle;
use crate::db::migrate::Migrator;
use crate::db::pool::DbPool;
use crate::db::query_cache::QueryCache;
use crate::db::statement::Statement;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseContext, Driver, SchemaDescriptor};
use crate::repository::Repository;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Pause after each successful seed file.
pub const SEED_THROTTLE: Duration = Duration::from_millis(10);

/// Builds a repository bound to a pool.
pub type RepositoryCtor<R> = Arc<dyn Fn(DbPool) -> R + Send + Sync>;

/// Owns the open connection and everything derived from it.
pub struct DatabaseManager<R: Repository> {
    ctx: DatabaseContext,
    pool: DbPool,
    queries: QueryCache,
    seed_paths: Vec<PathBuf>,
    repository: RepositoryCtor<R>,
}

impl<R: Repository> std::fmt::Debug for DatabaseManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("driver", &self.ctx.driver())
            .field("dsn", &self.ctx.masked_dsn())
            .field("queries", &self.queries.len())
            .field("seed_paths", &self.seed_paths)
            .finish_non_exhaustive()
    }
}

impl<R: Repository> DatabaseManager<R> {
    /// Open the connection and load every query file.
    ///
    /// Fails without returning a manager if the connection cannot be opened or
    /// any query file cannot be read. The pool opened before a query load
    /// failure is closed again.
    pub async fn new<F>(
        ctx: DatabaseContext,
        repository: F,
        seed_paths: Vec<PathBuf>,
        query_paths: HashMap<String, PathBuf>,
        options: Option<ConnectionOptions>,
    ) -> DbResult<Self>
    where
        F: Fn(DbPool) -> R + Send + Sync + 'static,
    {
        let options = options.unwrap_or_default();
        options.validate()?;

        info!(
            driver = %ctx.driver(),
            dsn = %ctx.masked_dsn(),
            sql_log_level = ctx.log_level().as_str(),
            "Initializing database manager"
        );
        let pool = ctx.dialector().open(&options).await?;

        let queries = match QueryCache::load(&query_paths).await {
            Ok(queries) => queries,
            Err(e) => {
                pool.close().await;
                return Err(e);
            }
        };

        Ok(Self {
            ctx,
            pool,
            queries,
            seed_paths,
            repository: Arc::new(repository),
        })
    }

    /// Run the seed files in order, pausing [`SEED_THROTTLE`] after each one.
    ///
    /// Stops at the first failure. Files that already ran stay applied.
    pub async fn seed(&self) -> DbResult<()> {
        let handle = ConnectionHandle::Pool(self.pool.clone());
        for (index, path) in self.seed_paths.iter().enumerate() {
            let shown = path.display().to_string();
            let sql = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DbError::seed(&shown, e.to_string()))?;

            handle
                .execute(&Statement::raw(sql))
                .await
                .map_err(|e| DbError::seed(&shown, e.to_string()))?;
            info!(
                path = %shown,
                step = index + 1,
                total = self.seed_paths.len(),
                "Seed file applied"
            );

            tokio::time::sleep(SEED_THROTTLE).await;
        }
        Ok(())
    }

    /// Cached text of the query `name`.
    pub fn get_query(&self, name: &str) -> DbResult<&str> {
        self.queries.get(name)
    }

    pub fn queries(&self) -> &QueryCache {
        &self.queries
    }

    /// A fresh repository bound to the connection.
    pub fn get_repository(&self) -> R {
        (self.repository)(self.pool.clone())
    }

    /// Reconcile the schema with `models`.
    pub async fn migrate(&self, models: &[SchemaDescriptor]) -> DbResult<()> {
        debug!(models = models.len(), "Running auto-migration");
        Migrator::new(&self.pool).auto_migrate(models).await
    }

    pub fn context(&self) -> &DatabaseContext {
        &self.ctx
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn driver(&self) -> Driver {
        self.ctx.driver()
    }

    pub fn seed_paths(&self) -> &[PathBuf] {
        &self.seed_paths
    }

    /// Best-effort server version.
    pub async fn server_version(&self) -> Option<String> {
        self.pool.server_version().await
    }

    pub async fn close(&self) {
        info!(driver = %self.ctx.driver(), "Closing database connection");
        self.pool.close().await;
    }
}
