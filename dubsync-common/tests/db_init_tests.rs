//! Integration tests for database initialization

use dubsync_common::db::init_database;
use sqlx::Row;
use tempfile::TempDir;

#[tokio::test]
async fn init_creates_database_file_and_tables() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("dubsync.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    let mut names: Vec<String> = rows.iter().map(|r| r.get::<String, _>("name")).collect();
    names.sort();
    for expected in ["playbacks", "sync_state", "tracks", "user_actions", "users"] {
        assert!(
            names.iter().any(|n| n == expected),
            "missing table {expected}, got {names:?}"
        );
    }
}

#[tokio::test]
async fn init_is_idempotent_on_existing_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("dubsync.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO sync_state (key, value) VALUES ('probe', '1')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    // Second init must not clobber existing data
    let pool = init_database(&db_path).await.unwrap();
    let value: String =
        sqlx::query_scalar("SELECT value FROM sync_state WHERE key = 'probe'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(value, "1");
}

#[tokio::test]
async fn foreign_keys_are_enforced() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("dubsync.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO playbacks (track_id, user_id, start_time) VALUES (999, NULL, 12345)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "dangling track_id should be rejected");
}
