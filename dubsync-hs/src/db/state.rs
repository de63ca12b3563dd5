//! Generic key/value state store
//!
//! JSON-encoded values in the `sync_state` table. The reconciliation
//! engine uses exactly one key, [`LAST_SYNCED_INSTANT`]; the generic
//! getter/setter exists so operators can inspect and seed it.

use dubsync_common::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqliteConnection;

/// Checkpoint key: epoch seconds of the most recent instant whose history
/// is known to be durably committed.
pub const LAST_SYNCED_INSTANT: &str = "last_synced_instant";

/// Load a state value, `None` if the key was never written.
pub async fn load_state<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    key: &str,
) -> Result<Option<T>> {
    let raw: Option<String> = sqlx::query_scalar("SELECT value FROM sync_state WHERE key = ?")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

    match raw {
        Some(json) => {
            let value = serde_json::from_str(&json).map_err(|e| {
                dubsync_common::Error::Internal(format!(
                    "Failed to decode state value for '{}': {}",
                    key, e
                ))
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Insert or overwrite a state value.
pub async fn save_state<T: Serialize>(
    conn: &mut SqliteConnection,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value).map_err(|e| {
        dubsync_common::Error::Internal(format!("Failed to encode state value for '{}': {}", key, e))
    })?;

    sqlx::query(
        r#"
        INSERT INTO sync_state (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(json)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
