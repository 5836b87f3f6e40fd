//! Models and helpers shared by the integration tests.

#![allow(dead_code)]

use dbfront::repository::Preload;
use dbfront::{
    ColumnDef, ColumnType, DatabaseContext, DatabaseManager, DbError, DbResult, Entity, Model,
    Repository, SchemaDescriptor, SqlRepository, Value,
};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub active: bool,
    #[sqlx(skip)]
    pub posts: Vec<Post>,
}

impl User {
    pub fn new(name: &str, email: &str, active: bool) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            active,
            ..Self::default()
        }
    }
}

impl Model for User {
    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", ColumnType::BigInt).primary_key(),
            ColumnDef::new("name", ColumnType::Varchar(100)),
            ColumnDef::new("email", ColumnType::Varchar(255)).unique(),
            ColumnDef::new("active", ColumnType::Boolean).default_value("TRUE"),
        ]
    }

    fn load_association<'a, R: Repository>(
        rows: &'a mut [Self],
        preload: &'a Preload,
        repo: R,
    ) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            if preload.name != "posts" {
                return Err(DbError::invalid_input(format!(
                    "unknown association '{}'",
                    preload.name
                )));
            }

            let ids: Vec<Value> = rows.iter().map(|u| Value::Int(u.id)).collect();
            let mut repo = repo.filter("user_id IN ?", vec![Value::List(ids)]);
            for cond in &preload.conds {
                repo = repo.filter(cond.sql.clone(), cond.args.clone());
            }
            let posts: Vec<Post> = repo.order("id").find().await?;

            for user in rows.iter_mut() {
                user.posts = posts
                    .iter()
                    .filter(|p| p.user_id == user.id)
                    .cloned()
                    .collect();
            }
            Ok(())
        })
    }
}

impl Entity for User {
    fn id(&self) -> Value {
        Value::Int(self.id)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(&self.name)),
            ("email", Value::from(&self.email)),
            ("active", Value::Bool(self.active)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
}

impl Model for Post {
    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", ColumnType::BigInt).primary_key(),
            ColumnDef::new("user_id", ColumnType::BigInt),
            ColumnDef::new("title", ColumnType::Varchar(200)),
        ]
    }
}

impl Entity for Post {
    fn id(&self) -> Value {
        Value::Int(self.id)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("user_id", Value::Int(self.user_id)),
            ("title", Value::from(&self.title)),
        ]
    }
}

/// Model keyed by a 32-bit integer.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct Tag {
    pub id: i32,
    pub label: String,
}

impl Model for Tag {
    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", ColumnType::Integer).primary_key(),
            ColumnDef::new("label", ColumnType::Varchar(50)),
        ]
    }
}

impl Entity for Tag {
    fn id(&self) -> Value {
        Value::from(self.id)
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![("label", Value::from(&self.label))]
    }
}

pub fn schemas() -> Vec<SchemaDescriptor> {
    vec![User::schema(), Post::schema()]
}

/// Manager over a fresh SQLite file with the test tables migrated.
///
/// The directory must outlive the manager.
pub async fn sqlite_manager() -> (TempDir, DatabaseManager<SqlRepository>) {
    let dir = TempDir::new().unwrap();
    let dsn = format!("sqlite:{}", dir.path().join("test.db").display());
    let ctx = DatabaseContext::new(&dsn, "sqlite", "silent").unwrap();
    let manager = DatabaseManager::new(ctx, SqlRepository::new, vec![], HashMap::new(), None)
        .await
        .unwrap();
    manager.migrate(&schemas()).await.unwrap();
    (dir, manager)
}

/// Manager for `url` when the variable `var` is set.
pub async fn external_manager(
    var: &str,
    driver: &str,
) -> Option<DatabaseManager<SqlRepository>> {
    let url = match std::env::var(var) {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: {} not set", var);
            return None;
        }
    };
    let ctx = DatabaseContext::new(&url, driver, "silent").unwrap();
    let manager = DatabaseManager::new(ctx, SqlRepository::new, vec![], HashMap::new(), None)
        .await
        .unwrap();
    let repo = manager.get_repository();
    repo.exec("DROP TABLE IF EXISTS tags", vec![]).await.unwrap();
    repo.exec("DROP TABLE IF EXISTS posts", vec![]).await.unwrap();
    repo.exec("DROP TABLE IF EXISTS users", vec![]).await.unwrap();
    manager.migrate(&schemas()).await.unwrap();
    Some(manager)
}
