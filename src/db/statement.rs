//! Dialect-aware statement rendering.
//!
//! Clauses are written with `?` placeholders. [`SqlWriter`] rewrites them to the
//! driver's placeholder form (`$n` on PostgreSQL), expands list arguments and
//! collects the flattened parameter list. Question marks inside quoted
//! literals or identifiers are left alone.

use crate::error::{DbError, DbResult};
use crate::models::{Driver, Value};

/// Final SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// Statement without parameters, executed as raw SQL.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Incremental statement builder for one dialect.
#[derive(Debug)]
pub struct SqlWriter {
    driver: Driver,
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Append literal SQL.
    pub fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    /// Append a quoted identifier.
    pub fn push_ident(&mut self, ident: &str) -> &mut Self {
        let quoted = self.driver.quote_ident(ident);
        self.sql.push_str(&quoted);
        self
    }

    /// Append a placeholder for `value`. Lists expand to `(?, ?, ...)`, or to
    /// `?, ?, ...` when the writer is already inside an opening parenthesis.
    pub fn push_value(&mut self, value: Value) -> &mut Self {
        match value {
            Value::List(items) => {
                let wrap = !self.sql.trim_end().ends_with('(');
                if wrap {
                    self.sql.push('(');
                }
                if items.is_empty() {
                    self.sql.push_str("NULL");
                }
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.push_scalar(item);
                }
                if wrap {
                    self.sql.push(')');
                }
            }
            other => self.push_scalar(other),
        }
        self
    }

    fn push_scalar(&mut self, value: Value) {
        // An untyped NULL parameter confuses PostgreSQL's type inference
        if value.is_null() {
            self.sql.push_str("NULL");
            return;
        }
        self.params.push(value);
        let placeholder = self.driver.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    /// Append a clause, substituting each `?` with the next argument.
    pub fn push_clause(&mut self, clause: &str, args: &[Value]) -> DbResult<&mut Self> {
        let expected = count_placeholders(clause);
        if expected != args.len() {
            return Err(DbError::invalid_input(format!(
                "clause '{}' has {} placeholder(s) but {} argument(s) were given",
                clause,
                expected,
                args.len()
            )));
        }

        let mut args = args.iter().cloned();
        let mut quote: Option<char> = None;
        for c in clause.chars() {
            match (quote, c) {
                (None, '\'' | '"' | '`') => {
                    quote = Some(c);
                    self.sql.push(c);
                }
                (Some(q), _) if q == c => {
                    quote = None;
                    self.sql.push(c);
                }
                (None, '?') => {
                    // count_placeholders guarantees an argument is left
                    let value = args.next().unwrap_or(Value::Null);
                    self.push_value(value);
                }
                _ => self.sql.push(c),
            }
        }
        Ok(self)
    }

    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Number of `?` placeholders outside quoted sections.
pub fn count_placeholders(clause: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut count = 0;
    for c in clause.chars() {
        match (quote, c) {
            (None, '\'' | '"' | '`') => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            (None, '?') => count += 1,
            _ => {}
        }
    }
    count
}
