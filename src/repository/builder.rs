//! Accumulated query state and its rendering.
//!
//! Chainable repository calls only record intent here. Rendering happens at the
//! terminal operation, when the model type (and so its table and primary key)
//! is known.

use crate::db::statement::{SqlWriter, Statement};
use crate::error::{DbError, DbResult};
use crate::models::{Driver, Value};
use serde::Serialize;

/// SQL fragment with `?` placeholders and its arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Clause {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Clause {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl From<&str> for Clause {
    fn from(sql: &str) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Association to load after the main query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preload {
    pub name: String,
    pub conds: Vec<Clause>,
}

/// A WHERE condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Filter {
    Raw(Clause),
    /// Primary key equals the value.
    KeyEquals(Value),
    /// Primary key is one of the values.
    KeyIn(Vec<Value>),
}

/// Builder state accumulated by chainable calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryState {
    /// Replaces the model's table when set, e.g. `users u` or a subquery.
    pub table: Option<Clause>,
    pub joins: Vec<Clause>,
    pub filters: Vec<Filter>,
    pub orders: Vec<String>,
    pub preloads: Vec<Preload>,
}

impl QueryState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Table the query targets, for error messages.
    pub fn table_name(&self, default: &str) -> String {
        match &self.table {
            Some(clause) => clause.sql.clone(),
            None => default.to_string(),
        }
    }

    /// `SELECT` for the model table. `first` adds primary key ordering and `LIMIT 1`.
    pub fn select(
        &self,
        driver: Driver,
        table: &str,
        primary_key: &str,
        conds: &[Clause],
        first: bool,
    ) -> DbResult<Statement> {
        let mut w = SqlWriter::new(driver);
        w.push("SELECT ");
        w.push(&self.select_columns(driver, table));
        w.push(" FROM ");
        self.push_target(&mut w, table)?;
        self.push_joins(&mut w)?;
        self.push_where(&mut w, table, primary_key, conds)?;

        let mut orders = self.orders.clone();
        if first {
            orders.push(self.key_column(driver, table, primary_key));
        }
        if !orders.is_empty() {
            w.push(" ORDER BY ").push(&orders.join(", "));
        }
        if first {
            w.push(" LIMIT 1");
        }
        Ok(w.finish())
    }

    /// `SELECT COUNT(*)`. Needs an explicit table since no model is involved.
    pub fn count(&self, driver: Driver) -> DbResult<Statement> {
        if self.table.is_none() {
            return Err(DbError::invalid_input(
                "count requires a table; call table() first",
            ));
        }
        let mut w = SqlWriter::new(driver);
        w.push("SELECT COUNT(*) FROM ");
        self.push_target(&mut w, "")?;
        self.push_joins(&mut w)?;
        self.push_where(&mut w, "", "id", &[])?;
        Ok(w.finish())
    }

    /// `INSERT` of the given columns. `returning` appends `RETURNING <key>` widened to BIGINT.
    pub fn insert(
        &self,
        driver: Driver,
        table: &str,
        primary_key: &str,
        columns: Vec<(&str, Value)>,
        returning: bool,
    ) -> DbResult<Statement> {
        if columns.is_empty() {
            return Err(DbError::invalid_input(format!(
                "nothing to insert into '{}'",
                self.table_name(table)
            )));
        }

        let mut w = SqlWriter::new(driver);
        w.push("INSERT INTO ");
        self.push_target(&mut w, table)?;
        w.push(" (");
        for (i, (name, _)) in columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_ident(name);
        }
        w.push(") VALUES (");
        for (i, (_, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_value(value);
        }
        w.push(")");
        if returning {
            w.push(" RETURNING CAST(")
                .push_ident(primary_key)
                .push(" AS BIGINT)");
        }
        Ok(w.finish())
    }

    /// `UPDATE` of the row with key `id`, further narrowed by any filters.
    pub fn update(
        &self,
        driver: Driver,
        table: &str,
        primary_key: &str,
        id: Value,
        values: Vec<(&str, Value)>,
    ) -> DbResult<Statement> {
        if values.is_empty() {
            return Err(DbError::invalid_input(format!(
                "nothing to update in '{}'",
                self.table_name(table)
            )));
        }

        let mut w = SqlWriter::new(driver);
        w.push("UPDATE ");
        self.push_target(&mut w, table)?;
        w.push(" SET ");
        for (i, (name, value)) in values.into_iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_ident(name).push(" = ").push_value(value);
        }
        self.keyed().with_key(id).push_where(&mut w, table, primary_key, &[])?;
        Ok(w.finish())
    }

    /// `DELETE` by key, by filters, or both. Refuses an unconditional delete.
    pub fn delete(
        &self,
        driver: Driver,
        table: &str,
        primary_key: &str,
        id: Option<Value>,
    ) -> DbResult<Statement> {
        let state = match id {
            Some(id) => self.keyed().with_key(id),
            None if self.filters.is_empty() => {
                return Err(DbError::invalid_input(format!(
                    "refusing to delete from '{}' without a primary key or conditions",
                    self.table_name(table)
                )));
            }
            None => self.keyed(),
        };

        let mut w = SqlWriter::new(driver);
        w.push("DELETE FROM ");
        self.push_target(&mut w, table)?;
        state.push_where(&mut w, table, primary_key, &[])?;
        Ok(w.finish())
    }

    /// Copy keeping only what write statements use.
    fn keyed(&self) -> Self {
        Self {
            table: self.table.clone(),
            filters: self.filters.clone(),
            ..Self::default()
        }
    }

    fn with_key(mut self, id: Value) -> Self {
        self.filters.insert(0, Filter::KeyEquals(id));
        self
    }

    fn select_columns(&self, driver: Driver, table: &str) -> String {
        if self.joins.is_empty() {
            return "*".to_string();
        }
        match &self.table {
            None => format!("{}.*", driver.quote_ident(table)),
            Some(clause) if is_plain_name(&clause.sql) => format!("{}.*", clause.sql),
            Some(_) => "*".to_string(),
        }
    }

    fn key_column(&self, driver: Driver, table: &str, primary_key: &str) -> String {
        if self.joins.is_empty() || self.table.is_some() {
            driver.quote_ident(primary_key)
        } else {
            format!(
                "{}.{}",
                driver.quote_ident(table),
                driver.quote_ident(primary_key)
            )
        }
    }

    fn push_target(&self, w: &mut SqlWriter, table: &str) -> DbResult<()> {
        match &self.table {
            Some(clause) => {
                w.push_clause(&clause.sql, &clause.args)?;
            }
            None => {
                w.push_ident(table);
            }
        }
        Ok(())
    }

    fn push_joins(&self, w: &mut SqlWriter) -> DbResult<()> {
        for join in &self.joins {
            w.push(" ");
            w.push_clause(&join.sql, &join.args)?;
        }
        Ok(())
    }

    fn push_where(
        &self,
        w: &mut SqlWriter,
        table: &str,
        primary_key: &str,
        conds: &[Clause],
    ) -> DbResult<()> {
        let total = self.filters.len() + conds.len();
        if total == 0 {
            return Ok(());
        }

        w.push(" WHERE ");
        let driver = w.driver();
        let extra = conds.iter().cloned().map(Filter::Raw);
        for (i, filter) in self.filters.iter().cloned().chain(extra).enumerate() {
            if i > 0 {
                w.push(" AND ");
            }
            match filter {
                Filter::Raw(clause) => {
                    let wrap = total > 1;
                    if wrap {
                        w.push("(");
                    }
                    w.push_clause(&clause.sql, &clause.args)?;
                    if wrap {
                        w.push(")");
                    }
                }
                Filter::KeyEquals(id) => {
                    w.push(&self.key_column(driver, table, primary_key))
                        .push(" = ")
                        .push_value(id);
                }
                Filter::KeyIn(ids) => {
                    w.push(&self.key_column(driver, table, primary_key))
                        .push(" IN ")
                        .push_value(Value::List(ids));
                }
            }
        }
        Ok(())
    }
}

fn is_plain_name(sql: &str) -> bool {
    !sql.is_empty()
        && sql
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
