/// Storage facade over PostgreSQL
///
/// Skipped unless DATABASE_URL points at a disposable test database. Every
/// test works under its own freshly registered usernames, so runs don't
/// interfere with each other or with leftovers from earlier runs.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::env;
use sqlx::migrate::MigrateDatabase;
use sqlx::Postgres;
use std::sync::Arc;
use taskdesk_shared::auth::password::PasswordConfig;
use taskdesk_shared::config::{AppConfig, Environment};
use taskdesk_shared::db::migrations::run_migrations;
use taskdesk_shared::db::pool::{create_pool, DatabaseConfig};
use taskdesk_shared::error::StorageError;
use taskdesk_shared::models::task::{CompletionPolicy, TaskFilter};
use taskdesk_shared::session::Session;
use taskdesk_shared::storage::Storage;
use taskdesk_shared::store::postgres::PgStore;

async fn storage() -> Option<Storage> {
    let url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty())?;
    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    })
    .await
    .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");

    Some(
        Storage::new(Arc::new(PgStore::new(pool)))
            .with_password_config(PasswordConfig::insecure_fast()),
    )
}

fn unique(name: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{}-{}", name, std::process::id(), nanos)
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid date")
}

async fn signed_in(storage: &Storage, name: &str) -> Session {
    let username = unique(name);
    storage.register(&username, "123").await.expect("register");
    storage.login(&username, "123").await.expect("login")
}

#[tokio::test]
async fn test_register_and_verify() {
    let Some(storage) = storage().await else { return };
    let username = unique("alice");

    storage.register(&username, "123").await.expect("register");
    storage.verify(&username, "123").await.expect("verify");

    assert!(matches!(
        storage.register(&username, "456").await.unwrap_err(),
        StorageError::UserAlreadyExists(_)
    ));
    assert!(matches!(
        storage.verify(&username, "456").await.unwrap_err(),
        StorageError::WrongPassword
    ));
    assert!(matches!(
        storage.verify(&unique("nobody"), "123").await.unwrap_err(),
        StorageError::UserNotFound(_)
    ));
}

#[tokio::test]
async fn test_concurrent_registration_yields_one_account() {
    let Some(storage) = storage().await else { return };
    let username = unique("racer");

    let (a, b) = tokio::join!(
        storage.register(&username, "123"),
        storage.register(&username, "123")
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(err, StorageError::UserAlreadyExists(_)), "{:?}", err);
        }
    }
}

#[tokio::test]
async fn test_add_task_for_unknown_user() {
    let Some(storage) = storage().await else { return };

    let err = storage
        .add_task(&Session::new(unique("ghost")), "Buy milk", None, "Hobby")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UserNotFound(_)));
}

#[tokio::test]
async fn test_task_lifecycle() {
    let Some(storage) = storage().await else { return };
    let session = signed_in(&storage, "alice").await;

    storage.add_task(&session, "Someday", None, "Hobby").await.expect("add");
    let milk = storage
        .add_task(&session, "Buy milk", Some(at(20, 18)), "Hobby")
        .await
        .expect("add");

    let lines: Vec<String> = storage
        .list_open_tasks_at(&session, at(21, 0))
        .await
        .expect("list")
        .into_iter()
        .map(|l| l.text)
        .collect();
    assert_eq!(
        lines,
        vec![
            "[Hobby] Buy milk (до 20.10.2026 18:00)   ПРОСРОЧЕНО!",
            "[Hobby] Someday",
        ]
    );

    storage.complete_task(&session, milk.id).await.expect("complete");
    assert_eq!(
        storage.list_completed_tasks(&session).await.expect("history"),
        vec!["Buy milk"]
    );
    assert!(matches!(
        storage.complete_task(&session, milk.id).await.unwrap_err(),
        StorageError::TaskNotFound(_)
    ));
}

#[tokio::test]
async fn test_complete_by_description_policies() {
    let Some(storage) = storage().await else { return };
    let session = signed_in(&storage, "alice").await;
    for _ in 0..3 {
        storage.add_task(&session, "Same", None, "Hobby").await.expect("add");
    }

    let first = storage.clone().with_completion_policy(CompletionPolicy::First);
    assert_eq!(first.complete_by_description(&session, "Same").await.expect("first"), 1);
    assert_eq!(storage.complete_by_description(&session, "Same").await.expect("all"), 2);
    assert_eq!(storage.complete_by_description(&session, "Same").await.expect("none"), 0);
}

#[tokio::test]
async fn test_search() {
    let Some(storage) = storage().await else { return };
    let session = signed_in(&storage, "alice").await;

    storage
        .add_task(&session, "Buy MILK", Some(at(12, 9)), "Hobby")
        .await
        .expect("add");
    storage
        .add_task(&session, "100% done_ish", Some(at(20, 9)), "Work")
        .await
        .expect("add");
    storage.add_task(&session, "Undated", None, "Hobby").await.expect("add");

    let text = storage
        .search_tasks(&session, &TaskFilter::default().text("milk"))
        .await
        .expect("search");
    assert_eq!(text.len(), 1);
    assert_eq!(text[0].text, "[Hobby] Buy MILK (до 12.10.2026 09:00)");

    // Wildcards in the search text are literal
    let literal = storage
        .search_tasks(&session, &TaskFilter::default().text("0% d"))
        .await
        .expect("search");
    assert_eq!(literal.len(), 1);
    let underscore = storage
        .search_tasks(&session, &TaskFilter::default().text("e_i"))
        .await
        .expect("search");
    assert_eq!(underscore.len(), 1);
    let no_wildcard_hit = storage
        .search_tasks(&session, &TaskFilter::default().text("B_y"))
        .await
        .expect("search");
    assert!(no_wildcard_hit.is_empty());

    let ranged = storage
        .search_tasks(
            &session,
            &TaskFilter::default().date_from(at(12, 9)).date_to(at(19, 0)),
        )
        .await
        .expect("search");
    assert_eq!(ranged.len(), 1);

    let none = storage
        .search_tasks(&session, &TaskFilter::default().text("exam"))
        .await
        .expect("search");
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_delete_account_cascades() {
    let Some(storage) = storage().await else { return };
    let session = signed_in(&storage, "alice").await;

    let done = storage.add_task(&session, "done", None, "Hobby").await.expect("add");
    storage.add_task(&session, "open", None, "Hobby").await.expect("add");
    storage.complete_task(&session, done.id).await.expect("complete");

    storage.delete_account(&session).await.expect("delete");

    assert!(matches!(
        storage.list_open_tasks(&session).await.unwrap_err(),
        StorageError::UserNotFound(_)
    ));
    assert!(matches!(
        storage.list_completed_tasks(&session).await.unwrap_err(),
        StorageError::UserNotFound(_)
    ));
}

#[tokio::test]
async fn test_closed_storage_is_unavailable() {
    let Some(storage) = storage().await else { return };
    let session = signed_in(&storage, "alice").await;

    storage.close().await;

    assert!(matches!(
        storage.list_open_tasks(&session).await.unwrap_err(),
        StorageError::StorageUnavailable(_)
    ));
}

#[tokio::test]
async fn test_development_connect_creates_missing_database() {
    let Some(url) = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()) else {
        return;
    };
    let Some((server, _)) = url.rsplit_once('/') else { return };
    if url.contains('?') {
        return;
    }
    let fresh_url = format!("{}/taskdesk_created_{}", server, std::process::id());
    if Postgres::database_exists(&fresh_url).await.expect("exists") {
        Postgres::drop_database(&fresh_url).await.expect("drop leftover");
    }

    let config = AppConfig {
        environment: Environment::Development,
        database: DatabaseConfig {
            url: fresh_url.clone(),
            max_connections: 2,
            min_connections: 0,
            ..Default::default()
        },
        password: PasswordConfig::insecure_fast(),
        ..Default::default()
    };
    let storage = Storage::connect(&config).await.expect("connect");
    storage.register("alice", "123").await.expect("register");
    storage.close().await;

    assert!(Postgres::database_exists(&fresh_url).await.expect("exists"));
    Postgres::drop_database(&fresh_url).await.expect("drop");
}

