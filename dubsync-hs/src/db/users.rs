//! User queries
//!
//! Natural key: `external_id`. Display names change across syncs without
//! creating a new user; the upsert refreshes them in place.

use dubsync_common::db::User;
use dubsync_common::{Error, Result};
use sqlx::SqliteConnection;

/// Fields required to insert or update a user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub external_id: &'a str,
    pub display_name: &'a str,
}

impl NewUser<'_> {
    /// Reject malformed input before any I/O happens.
    fn validate(&self) -> Result<()> {
        if self.external_id.is_empty() {
            return Err(Error::Validation("user external_id is empty".into()));
        }
        if self.display_name.is_empty() {
            return Err(Error::Validation("user display_name is empty".into()));
        }
        Ok(())
    }
}

/// Look a user up by its durable external id.
pub async fn get_user(conn: &mut SqliteConnection, external_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, external_id, display_name, country FROM users WHERE external_id = ?",
    )
    .bind(external_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

/// Insert a user; on external-id conflict, update the existing row and
/// return it.
pub async fn upsert_user(conn: &mut SqliteConnection, user: &NewUser<'_>) -> Result<Option<User>> {
    user.validate()?;
    let row = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (external_id, display_name)
        VALUES (?, ?)
        ON CONFLICT(external_id) DO UPDATE SET display_name = excluded.display_name
        RETURNING id, external_id, display_name, country
        "#,
    )
    .bind(user.external_id)
    .bind(user.display_name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Get a user by natural key, creating it if absent.
pub async fn get_or_create_user(conn: &mut SqliteConnection, user: &NewUser<'_>) -> Result<User> {
    if let Some(existing) = get_user(&mut *conn, user.external_id).await? {
        return Ok(existing);
    }
    if let Some(created) = upsert_user(&mut *conn, user).await? {
        return Ok(created);
    }
    tracing::error!(external_id = user.external_id, "Failed to save user");
    Err(Error::Persistence(format!(
        "Impossible to save user {}",
        user.external_id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_test_db;

    #[tokio::test]
    async fn get_or_create_is_idempotent_on_external_id() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create_user(
            &mut conn,
            &NewUser {
                external_id: "dt-1",
                display_name: "alice",
            },
        )
        .await
        .unwrap();

        // Same natural key, different display name: same id, name updated
        // only when going through the upsert path.
        let second = get_or_create_user(
            &mut conn,
            &NewUser {
                external_id: "dt-1",
                display_name: "alice",
            },
        )
        .await
        .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn upsert_updates_display_name_on_conflict() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = upsert_user(
            &mut conn,
            &NewUser {
                external_id: "dt-2",
                display_name: "old-name",
            },
        )
        .await
        .unwrap()
        .unwrap();

        let second = upsert_user(
            &mut conn,
            &NewUser {
                external_id: "dt-2",
                display_name: "new-name",
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name, "new-name");
    }

    #[tokio::test]
    async fn empty_external_id_is_rejected_before_io() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let err = upsert_user(
            &mut conn,
            &NewUser {
                external_id: "",
                display_name: "ghost",
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
