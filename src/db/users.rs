use crate::db::models::User;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::SqlitePool;

pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    full_name: &str,
    password_hash: Option<String>,
) -> AppResult<User> {
    let user = User::new(email.to_string(), full_name.to_string(), password_hash);

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, full_name, is_active, last_login_at, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(user.is_active)
    .bind(&user.last_login_at)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(pool)
    .await?;

    Ok(user)
}

/// Lookup by email. Returns `None` for unknown addresses instead of an error
/// so login paths can answer identically for unknown-user and bad-password.
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                AppError::NotFound(format!("User with id '{}' not found", user_id))
            }
            _ => AppError::Database(e),
        })?;

    Ok(user)
}

pub async fn record_login(pool: &SqlitePool, user_id: &str) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(&now)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Partial profile update. `None` fields keep their current value.
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: &str,
    email: Option<&str>,
    full_name: Option<&str>,
    password_hash: Option<&str>,
) -> AppResult<User> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE users
         SET email = COALESCE(?, email),
             full_name = COALESCE(?, full_name),
             password_hash = COALESCE(?, password_hash),
             updated_at = ?
         WHERE id = ?",
    )
    .bind(email)
    .bind(full_name)
    .bind(password_hash)
    .bind(&now)
    .bind(user_id)
    .execute(pool)
    .await?;

    find_by_id(pool, user_id).await
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

    #[tokio::test]
    async fn email_lookup_is_optional_not_an_error() {
        let (pool, _dir) = test_pool().await;

        assert!(find_by_email(&pool, "ghost@example.com")
            .await
            .unwrap()
            .is_none());

        create_user(&pool, "a@example.com", "A", Some("hash".into()))
            .await
            .unwrap();
        let found = find_by_email(&pool, "a@example.com").await.unwrap().unwrap();
        assert_eq!(found.full_name, "A");
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (pool, _dir) = test_pool().await;

        let err = find_by_id(&pool, "no-such-id").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn partial_update_keeps_unset_fields() {
        let (pool, _dir) = test_pool().await;

        let user = create_user(&pool, "a@example.com", "A", Some("hash-1".into()))
            .await
            .unwrap();

        let updated = update_profile(&pool, &user.id, None, Some("B"), None)
            .await
            .unwrap();
        assert_eq!(updated.full_name, "B");
        assert_eq!(updated.email, "a@example.com");
        assert_eq!(updated.password_hash.as_deref(), Some("hash-1"));

        let updated = update_profile(&pool, &user.id, Some("b@example.com"), None, Some("hash-2"))
            .await
            .unwrap();
        assert_eq!(updated.email, "b@example.com");
        assert_eq!(updated.full_name, "B");
        assert_eq!(updated.password_hash.as_deref(), Some("hash-2"));
    }

    #[tokio::test]
    async fn record_login_stamps_timestamp() {
        let (pool, _dir) = test_pool().await;

        let user = create_user(&pool, "a@example.com", "A", None).await.unwrap();
        assert!(user.last_login_at.is_none());

        record_login(&pool, &user.id).await.unwrap();
        let reloaded = find_by_id(&pool, &user.id).await.unwrap();
        assert!(reloaded.last_login_at.is_some());
    }
}
