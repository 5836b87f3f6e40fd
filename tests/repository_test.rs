//! Integration tests for SqlRepository against SQLite.

mod common;

use common::{Post, User, sqlite_manager};
use dbfront::repository::{Clause, QueryContext};
use dbfront::{DbError, Repository, Value, args};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_create_read_update_delete() {
    let (_dir, manager) = sqlite_manager().await;

    let id = manager
        .get_repository()
        .create(&User::new("Ann", "ann@example.com", true))
        .await
        .unwrap()
        .expect("sqlite reports the generated key");

    let mut ann: User = manager.get_repository().first_by_id(id).await.unwrap();
    assert_eq!(ann.name, "Ann");
    assert!(ann.active);

    ann.name = "Annie".to_string();
    let changed = manager.get_repository().update(&ann).await.unwrap();
    assert_eq!(changed, 1);

    let reloaded: User = manager.get_repository().first_by_id(id).await.unwrap();
    assert_eq!(reloaded.name, "Annie");

    let removed = manager.get_repository().delete(&reloaded).await.unwrap();
    assert_eq!(removed, 1);

    let err = manager
        .get_repository()
        .first_by_id::<User>(id)
        .await
        .unwrap_err();
    match err {
        DbError::NotFound { table } => assert_eq!(table, "users"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unique_violation_is_constraint_error() {
    let (_dir, manager) = sqlite_manager().await;
    let user = User::new("Bob", "bob@example.com", true);

    manager.get_repository().create(&user).await.unwrap();
    let err = manager.get_repository().create(&user).await.unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation { .. }), "{err}");
}

#[tokio::test]
async fn test_filters_order_and_count() {
    let (_dir, manager) = sqlite_manager().await;
    for (name, active) in [("Cy", true), ("Di", false), ("Ed", true), ("Flo", true)] {
        let email = format!("{}@example.com", name.to_lowercase());
        manager
            .get_repository()
            .create(&User::new(name, &email, active))
            .await
            .unwrap();
    }

    let active: Vec<User> = manager
        .get_repository()
        .is_active()
        .order("name DESC")
        .find()
        .await
        .unwrap();
    let names: Vec<_> = active.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Flo", "Ed", "Cy"]);

    let picked: Vec<User> = manager
        .get_repository()
        .id_in(args![1, 3])
        .order("id")
        .find()
        .await
        .unwrap();
    assert_eq!(picked.len(), 2);
    assert_eq!(picked[1].name, "Ed");

    let short_names = manager
        .get_repository()
        .table("users", vec![])
        .filter("length(name) = ?", args![2])
        .count()
        .await
        .unwrap();
    assert_eq!(short_names, 3);

    let first_inactive: User = manager
        .get_repository()
        .first(vec![Clause::new("active = ?", args![false])])
        .await
        .unwrap();
    assert_eq!(first_inactive.name, "Di");
}

#[tokio::test]
async fn test_id_equal_and_joins() {
    let (_dir, manager) = sqlite_manager().await;
    let repo = manager.get_repository();
    let ann = repo
        .clone()
        .create(&User::new("Ann", "ann@example.com", true))
        .await
        .unwrap()
        .unwrap();
    repo.clone()
        .create(&User::new("Bob", "bob@example.com", true))
        .await
        .unwrap();
    repo.clone()
        .create(&Post {
            user_id: ann,
            title: "hello".to_string(),
            ..Post::default()
        })
        .await
        .unwrap();

    let authors: Vec<User> = repo
        .clone()
        .joins("JOIN posts ON posts.user_id = users.id", vec![])
        .filter("posts.title = ?", args!["hello"])
        .find()
        .await
        .unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].id, ann);

    let by_id: Vec<User> = repo.id_equal(ann).find().await.unwrap();
    assert_eq!(by_id[0].name, "Ann");
}

#[tokio::test]
async fn test_multiline_or_filter_keeps_precedence() {
    let (_dir, manager) = sqlite_manager().await;
    let repo = manager.get_repository();
    for name in ["a", "b", "c"] {
        repo.clone()
            .create(&User::new(name, &format!("{name}@example.com"), true))
            .await
            .unwrap();
    }

    let rows: Vec<User> = repo
        .clone()
        .id_equal(1)
        .filter("name = ?\nOR name = ?", args!["b", "c"])
        .find()
        .await
        .unwrap();
    assert!(rows.is_empty());

    let rows: Vec<User> = repo
        .id_equal(3)
        .filter("name = ?\tOR name = ?", args!["b", "c"])
        .find()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "c");
}

#[tokio::test]
async fn test_preload_posts() {
    let (_dir, manager) = sqlite_manager().await;
    let repo = manager.get_repository();
    let ann = repo
        .clone()
        .create(&User::new("Ann", "ann@example.com", true))
        .await
        .unwrap()
        .unwrap();
    let bob = repo
        .clone()
        .create(&User::new("Bob", "bob@example.com", true))
        .await
        .unwrap()
        .unwrap();
    for (user_id, title) in [(ann, "one"), (ann, "two"), (bob, "three")] {
        repo.clone()
            .create(&Post {
                user_id,
                title: title.to_string(),
                ..Post::default()
            })
            .await
            .unwrap();
    }

    let users: Vec<User> = repo
        .clone()
        .preload("posts", vec![])
        .order("id")
        .find()
        .await
        .unwrap();
    assert_eq!(users[0].posts.len(), 2);
    assert_eq!(users[1].posts[0].title, "three");

    let bob_row: User = repo
        .clone()
        .preload("posts", vec![Clause::new("title <> ?", args!["three"])])
        .first_by_id(bob)
        .await
        .unwrap();
    assert!(bob_row.posts.is_empty());

    let err = repo
        .preload("comments", vec![])
        .find::<User>()
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_update_without_key_is_rejected() {
    let (_dir, manager) = sqlite_manager().await;
    let err = manager
        .get_repository()
        .update(&User::new("Nobody", "nobody@example.com", true))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));

    let err = manager
        .get_repository()
        .delete(&User::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_delete_by_filter() {
    let (_dir, manager) = sqlite_manager().await;
    let repo = manager.get_repository();
    for (name, active) in [("Gus", false), ("Hal", false), ("Ivy", true)] {
        let email = format!("{}@example.com", name.to_lowercase());
        repo.clone()
            .create(&User::new(name, &email, active))
            .await
            .unwrap();
    }

    let removed = repo
        .clone()
        .filter("active = ?", args![false])
        .delete(&User::default())
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let left = repo.table("users", vec![]).count().await.unwrap();
    assert_eq!(left, 1);
}

#[tokio::test]
async fn test_exec_with_arguments() {
    let (_dir, manager) = sqlite_manager().await;
    let repo = manager.get_repository();
    repo.exec(
        "INSERT INTO users (name, email, active) VALUES (?, ?, ?)",
        args!["Jo", "jo@example.com", true],
    )
    .await
    .unwrap();

    let updated = repo
        .exec(
            "UPDATE users SET name = ? WHERE email IN ?",
            vec![
                Value::from("Joanna"),
                Value::List(args!["jo@example.com", "x@example.com"]),
            ],
        )
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let err = repo
        .exec("UPDATE users SET name = ? WHERE id = ?", args!["x"])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_context_cancellation() {
    let (_dir, manager) = sqlite_manager().await;
    let token = CancellationToken::new();
    token.cancel();

    let repo = manager
        .get_repository()
        .with_context(QueryContext::new().with_cancellation(token));
    let err = repo.find::<User>().await.unwrap_err();
    assert!(matches!(err, DbError::Cancelled { .. }));
}

#[tokio::test]
async fn test_context_timeout() {
    let (_dir, manager) = sqlite_manager().await;
    let repo = manager
        .get_repository()
        .with_context(QueryContext::new().with_timeout(Duration::from_millis(20)));

    let err = repo
        .exec(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < ?) \
             SELECT COUNT(*) FROM c",
            args![50_000_000],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Timeout { .. }), "{err}");
}
