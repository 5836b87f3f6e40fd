//! Named SQL text loaded from files.

use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension of query files picked up by [`discover`].
pub const SQL_FILE_EXTENSION: &str = "sql";

/// Write-once map of query name to raw SQL text.
///
/// Populated completely by [`QueryCache::load`] before it is handed out, so
/// readers never observe a partial cache.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    queries: HashMap<String, String>,
}

impl QueryCache {
    /// Read every file in `paths`. The first unreadable file aborts the load.
    pub async fn load(paths: &HashMap<String, PathBuf>) -> DbResult<Self> {
        let mut queries = HashMap::with_capacity(paths.len());
        for (name, path) in paths {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DbError::query_load(path.display().to_string(), e))?;
            debug!(name = %name, path = %path.display(), bytes = text.len(), "Loaded query");
            queries.insert(name.clone(), text);
        }
        info!(count = queries.len(), "Query cache populated");
        Ok(Self { queries })
    }

    pub fn get(&self, name: &str) -> DbResult<&str> {
        self.queries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DbError::query_not_found(name))
    }

    /// Cached names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.queries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Map every `*.sql` file directly inside `dir` to its file stem.
pub fn discover(dir: &Path) -> DbResult<HashMap<String, PathBuf>> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| DbError::query_load(dir.display().to_string(), e))?;

    let mut found = HashMap::new();
    for entry in entries {
        let path = entry
            .map_err(|e| DbError::query_load(dir.display().to_string(), e))?
            .path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(SQL_FILE_EXTENSION)
        {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            found.insert(stem.to_string(), path.clone());
        }
    }
    Ok(found)
}
