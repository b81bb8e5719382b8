//! # Credential Database Operations
//!
//! CRUD for registered passkey credentials. Rows hold the serialized
//! public-key record plus a mirrored signature counter; private keys never
//! reach the server.

use crate::db::models::PasskeyCredential;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::SqlitePool;

/// Persist a newly verified credential.
///
/// `credential_id` is the base64url credential id and doubles as the primary
/// key, which is what makes credential ids globally unique: a second
/// registration of the same id, by any user, must be rejected before calling
/// this (see [`exists`]).
#[allow(clippy::too_many_arguments)]
pub async fn save_credential(
    pool: &SqlitePool,
    credential_id: &str,
    user_id: &str,
    passkey_data: &[u8],
    counter: u32,
    name: &str,
    backup_eligible: bool,
    backup_state: bool,
) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO credentials
         (id, user_id, passkey_data, counter, name, backup_eligible, backup_state, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(credential_id)
    .bind(user_id)
    .bind(passkey_data)
    .bind(counter as i64)
    .bind(name)
    .bind(backup_eligible)
    .bind(backup_state)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether a credential id is already registered to any user.
pub async fn exists(pool: &SqlitePool, credential_id: &str) -> AppResult<bool> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM credentials WHERE id = ?")
        .bind(credential_id)
        .fetch_one(pool)
        .await?;

    Ok(count.0 > 0)
}

/// All credentials registered to a user. Empty vector if there are none.
pub async fn find_by_user_id(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<PasskeyCredential>> {
    let credentials = sqlx::query_as::<_, PasskeyCredential>(
        "SELECT * FROM credentials WHERE user_id = ? ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(credentials)
}

/// Look up a credential by its base64url id.
///
/// Used during authentication to find the stored public key for an
/// assertion. NotFound here means the client asserted with a credential we
/// never registered (or one that was deleted).
pub async fn find_by_credential_id(
    pool: &SqlitePool,
    credential_id: &str,
) -> AppResult<PasskeyCredential> {
    let credential =
        sqlx::query_as::<_, PasskeyCredential>("SELECT * FROM credentials WHERE id = ?")
            .bind(credential_id)
            .fetch_one(pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    AppError::NotFound(format!("Credential '{}' not found", credential_id))
                }
                _ => AppError::Database(e),
            })?;

    Ok(credential)
}

/// Persist the outcome of a successful authentication.
///
/// Writes back the re-serialized record (its internal counter and backup
/// state may have moved), mirrors the new counter into the column the
/// cloning check reads, and stamps `last_used_at`. The counter column only
/// ever moves forward; the policy check happens before this is called.
pub async fn record_authentication(
    pool: &SqlitePool,
    credential_id: &str,
    passkey_data: &[u8],
    new_counter: u32,
) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE credentials
         SET passkey_data = ?, counter = ?, last_used_at = ?
         WHERE id = ?",
    )
    .bind(passkey_data)
    .bind(new_counter as i64)
    .bind(now)
    .bind(credential_id)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_pool() -> (SqlitePool, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("test.db").display());
        let pool = SqlitePool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        (pool, dir)
    }

    async fn seed_user(pool: &SqlitePool) -> String {
        crate::db::users::create_user(pool, "a@example.com", "A", None)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn save_then_exists_and_lookup() {
        let (pool, _dir) = test_pool().await;
        let user_id = seed_user(&pool).await;

        assert!(!exists(&pool, "cred-1").await.unwrap());
        save_credential(&pool, "cred-1", &user_id, b"record", 0, "YubiKey", false, false)
            .await
            .unwrap();
        assert!(exists(&pool, "cred-1").await.unwrap());

        let cred = find_by_credential_id(&pool, "cred-1").await.unwrap();
        assert_eq!(cred.user_id, user_id);
        assert_eq!(cred.counter, 0);
        assert_eq!(cred.name, "YubiKey");
        assert!(cred.last_used_at.is_none());

        let err = find_by_credential_id(&pool, "cred-2").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn record_authentication_moves_counter_and_stamp() {
        let (pool, _dir) = test_pool().await;
        let user_id = seed_user(&pool).await;

        save_credential(&pool, "cred-1", &user_id, b"v1", 0, "Passkey", false, false)
            .await
            .unwrap();
        record_authentication(&pool, "cred-1", b"v2", 7).await.unwrap();

        let cred = find_by_credential_id(&pool, "cred-1").await.unwrap();
        assert_eq!(cred.counter, 7);
        assert_eq!(cred.passkey_data, b"v2");
        assert!(cred.last_used_at.is_some());
    }

    #[tokio::test]
    async fn credentials_list_in_registration_order() {
        let (pool, _dir) = test_pool().await;
        let user_id = seed_user(&pool).await;

        save_credential(&pool, "cred-a", &user_id, b"a", 0, "First", false, false)
            .await
            .unwrap();
        // Force a deterministic ordering between the two rows.
        sqlx::query("UPDATE credentials SET created_at = '2000-01-01T00:00:00+00:00' WHERE id = ?")
            .bind("cred-a")
            .execute(&pool)
            .await
            .unwrap();
        save_credential(&pool, "cred-b", &user_id, b"b", 0, "Second", false, false)
            .await
            .unwrap();

        let creds = find_by_user_id(&pool, &user_id).await.unwrap();
        assert_eq!(creds.len(), 2);
        assert_eq!(creds[0].id, "cred-a");
        assert_eq!(creds[1].id, "cred-b");
    }
}
