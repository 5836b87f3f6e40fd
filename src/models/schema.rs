//! Schema descriptors consumed by auto-migration.

use crate::models::context::Driver;
use serde::{Deserialize, Serialize};

/// Logical column type, rendered per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    BigInt,
    Float,
    Boolean,
    Text,
    Varchar(u32),
    Timestamp,
    Json,
    Blob,
}

impl ColumnType {
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer | Self::BigInt)
    }

    /// SQL type name for the given dialect.
    pub fn sql_type(&self, driver: Driver) -> String {
        match (self, driver) {
            (Self::Integer, Driver::MySql) => "INT".to_string(),
            (Self::Integer, _) => "INTEGER".to_string(),
            (Self::BigInt, Driver::Sqlite) => "INTEGER".to_string(),
            (Self::BigInt, _) => "BIGINT".to_string(),
            (Self::Float, Driver::Postgres) => "DOUBLE PRECISION".to_string(),
            (Self::Float, Driver::MySql) => "DOUBLE".to_string(),
            (Self::Float, Driver::Sqlite) => "REAL".to_string(),
            (Self::Boolean, _) => "BOOLEAN".to_string(),
            (Self::Text, Driver::MySql) => "LONGTEXT".to_string(),
            (Self::Text, _) => "TEXT".to_string(),
            (Self::Varchar(n), _) => format!("VARCHAR({})", n),
            (Self::Timestamp, Driver::Postgres) => "TIMESTAMPTZ".to_string(),
            (Self::Timestamp, Driver::MySql) => "DATETIME(6)".to_string(),
            (Self::Timestamp, Driver::Sqlite) => "DATETIME".to_string(),
            (Self::Json, Driver::Postgres) => "JSONB".to_string(),
            (Self::Json, Driver::MySql) => "JSON".to_string(),
            (Self::Json, Driver::Sqlite) => "TEXT".to_string(),
            (Self::Blob, Driver::Postgres) => "BYTEA".to_string(),
            (Self::Blob, Driver::MySql) => "LONGBLOB".to_string(),
            (Self::Blob, Driver::Sqlite) => "BLOB".to_string(),
        }
    }
}

/// A column of a model's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
    /// Raw SQL default expression
    pub default_value: Option<String>,
}

impl ColumnDef {
    /// Create a NOT NULL column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            nullable: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default_value = Some(expr.into());
        self
    }

    /// Column definition as used in CREATE TABLE / ADD COLUMN.
    ///
    /// `inline_key` is set when this column is the table's only primary key;
    /// an integer key is then made auto-incrementing.
    pub fn definition(&self, driver: Driver, inline_key: bool) -> String {
        let name = driver.quote_ident(&self.name);

        if inline_key && self.column_type.is_integer() {
            return match driver {
                Driver::Sqlite => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", name),
                Driver::Postgres if self.column_type == ColumnType::Integer => {
                    format!("{} SERIAL PRIMARY KEY", name)
                }
                Driver::Postgres => format!("{} BIGSERIAL PRIMARY KEY", name),
                Driver::MySql => format!(
                    "{} {} AUTO_INCREMENT PRIMARY KEY",
                    name,
                    self.column_type.sql_type(driver)
                ),
            };
        }

        let mut def = format!("{} {}", name, self.column_type.sql_type(driver));
        if inline_key {
            def.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if self.unique && !inline_key {
            def.push_str(" UNIQUE");
        }
        if let Some(ref expr) = self.default_value {
            def.push_str(" DEFAULT ");
            def.push_str(expr);
        }
        def
    }
}

/// Table name plus columns: what auto-migration reconciles against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl SchemaDescriptor {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// Descriptor of a model type.
    pub fn of<M: crate::models::Model>() -> Self {
        M::schema()
    }

    pub fn primary_keys(&self) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// CREATE TABLE IF NOT EXISTS statement for this dialect.
    pub fn create_table_sql(&self, driver: Driver) -> String {
        let keys = self.primary_keys();
        let inline = keys.len() == 1;

        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.definition(driver, inline && c.primary_key))
            .collect();

        if keys.len() > 1 {
            let names: Vec<String> = keys.iter().map(|c| driver.quote_ident(&c.name)).collect();
            parts.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            driver.quote_ident(&self.table),
            parts.join(", ")
        )
    }

    /// ALTER TABLE statement adding `column`.
    ///
    /// Existing rows have no value for the new column, so it is only added
    /// as NOT NULL when it carries a default.
    pub fn add_column_sql(&self, driver: Driver, column: &ColumnDef) -> String {
        let definition = if column.default_value.is_none() && !column.nullable {
            column.clone().nullable().definition(driver, false)
        } else {
            column.definition(driver, false)
        };
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            driver.quote_ident(&self.table),
            definition
        )
    }
}

/// Default table name for a Rust type: last path segment, snake_case, pluralized.
///
/// `my_app::DummyModel` becomes `dummy_models`, `Category` becomes `categories`.
pub fn table_name_for(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let base = base.rsplit("::").next().unwrap_or(base);
    pluralize(&snake_case(base))
}

fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn pluralize(word: &str) -> String {
    let consonant_y = word.ends_with('y')
        && !matches!(
            word.chars().rev().nth(1),
            Some('a' | 'e' | 'i' | 'o' | 'u')
        );

    if consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_for() {
        assert_eq!(table_name_for("my_app::models::DummyModel"), "dummy_models");
        assert_eq!(table_name_for("Category"), "categories");
        assert_eq!(table_name_for("Box"), "boxes");
        assert_eq!(table_name_for("Day"), "days");
        assert_eq!(table_name_for("HTTPRequest"), "http_requests");
        assert_eq!(table_name_for("crate::Wrapper<u8>"), "wrappers");
        assert_eq!(table_name_for("User"), "users");
    }

    #[test]
    fn test_create_table_sqlite() {
        let schema = SchemaDescriptor::new(
            "users",
            vec![
                ColumnDef::new("id", ColumnType::BigInt).primary_key(),
                ColumnDef::new("name", ColumnType::Varchar(64)).unique(),
                ColumnDef::new("active", ColumnType::Boolean).default_value("TRUE"),
                ColumnDef::new("bio", ColumnType::Text).nullable(),
            ],
        );
        assert_eq!(
            schema.create_table_sql(Driver::Sqlite),
            "CREATE TABLE IF NOT EXISTS \"users\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"name\" VARCHAR(64) NOT NULL UNIQUE, \"active\" BOOLEAN NOT NULL DEFAULT TRUE, \
             \"bio\" TEXT)"
        );
    }

    #[test]
    fn test_create_table_postgres_and_mysql_keys() {
        let schema = SchemaDescriptor::new(
            "events",
            vec![
                ColumnDef::new("id", ColumnType::BigInt).primary_key(),
                ColumnDef::new("payload", ColumnType::Json),
            ],
        );
        let pg = schema.create_table_sql(Driver::Postgres);
        assert!(pg.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(pg.contains("\"payload\" JSONB NOT NULL"));

        let my = schema.create_table_sql(Driver::MySql);
        assert!(my.contains("`id` BIGINT AUTO_INCREMENT PRIMARY KEY"));
    }

    #[test]
    fn test_composite_primary_key() {
        let schema = SchemaDescriptor::new(
            "memberships",
            vec![
                ColumnDef::new("user_id", ColumnType::BigInt).primary_key(),
                ColumnDef::new("group_id", ColumnType::BigInt).primary_key(),
            ],
        );
        let sql = schema.create_table_sql(Driver::Postgres);
        assert!(sql.contains("\"user_id\" BIGINT NOT NULL"));
        assert!(sql.ends_with("PRIMARY KEY (\"user_id\", \"group_id\"))"));
    }

    #[test]
    fn test_add_column_sql() {
        let schema = SchemaDescriptor::new("users", vec![]);
        let col = ColumnDef::new("email", ColumnType::Text).nullable();
        assert_eq!(
            schema.add_column_sql(Driver::MySql, &col),
            "ALTER TABLE `users` ADD COLUMN `email` LONGTEXT"
        );

        let required = ColumnDef::new("body", ColumnType::Text);
        assert_eq!(
            schema.add_column_sql(Driver::Sqlite, &required),
            "ALTER TABLE \"users\" ADD COLUMN \"body\" TEXT"
        );
        let defaulted = ColumnDef::new("score", ColumnType::Integer).default_value("0");
        assert_eq!(
            schema.add_column_sql(Driver::Postgres, &defaulted),
            "ALTER TABLE \"users\" ADD COLUMN \"score\" INTEGER NOT NULL DEFAULT 0"
        );
    }
}
