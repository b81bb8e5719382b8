use crate::db::models::{Challenge, ChallengePurpose};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::SqlitePool;

pub async fn save_challenge(
    pool: &SqlitePool,
    user_id: Option<&str>,
    purpose: ChallengePurpose,
    state: &[u8],
) -> AppResult<String> {
    let challenge = Challenge::new(user_id.map(str::to_string), purpose, state.to_vec());

    sqlx::query(
        "INSERT INTO challenges (id, user_id, purpose, state, created_at, expires_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&challenge.id)
    .bind(&challenge.user_id)
    .bind(&challenge.purpose)
    .bind(&challenge.state)
    .bind(&challenge.created_at)
    .bind(&challenge.expires_at)
    .execute(pool)
    .await?;

    Ok(challenge.id)
}

/// Load a challenge by the id handed out at start time.
///
/// The purpose must match so a registration challenge can never satisfy an
/// authentication verify (or vice versa). Expired rows are rejected even if
/// the cleanup task has not removed them yet.
pub async fn get_by_id(
    pool: &SqlitePool,
    challenge_id: &str,
    purpose: ChallengePurpose,
) -> AppResult<Challenge> {
    let challenge =
        sqlx::query_as::<_, Challenge>("SELECT * FROM challenges WHERE id = ? AND purpose = ?")
            .bind(challenge_id)
            .bind(purpose.as_str())
            .fetch_one(pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => AppError::NotFound("Challenge not found".to_string()),
                _ => AppError::Database(e),
            })?;

    if challenge.is_expired() {
        return Err(AppError::ChallengeExpired);
    }

    Ok(challenge)
}

/// Most recent pending challenge for a user. Registration ceremonies are
/// keyed this way: the verify call belongs to whichever options request the
/// authenticated user made last.
pub async fn get_latest_for_user(
    pool: &SqlitePool,
    user_id: &str,
    purpose: ChallengePurpose,
) -> AppResult<Challenge> {
    let challenge = sqlx::query_as::<_, Challenge>(
        "SELECT * FROM challenges
         WHERE user_id = ? AND purpose = ?
         ORDER BY created_at DESC
         LIMIT 1",
    )
    .bind(user_id)
    .bind(purpose.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => {
            AppError::NotFound(format!("No pending {} challenge", purpose.as_str()))
        }
        _ => AppError::Database(e),
    })?;

    if challenge.is_expired() {
        return Err(AppError::ChallengeExpired);
    }

    Ok(challenge)
}

/// Consume a challenge. Called once, on successful verification.
pub async fn delete_challenge(pool: &SqlitePool, challenge_id: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM challenges WHERE id = ?")
        .bind(challenge_id)
        .execute(pool)
        .await?;

    Ok(())
}

// Reap expired rows; driven by the periodic task in main.
pub async fn cleanup_expired_challenges(pool: &SqlitePool) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query("DELETE FROM challenges WHERE expires_at < ?")
        .bind(&now)
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

    #[tokio::test]
    async fn challenge_roundtrip_and_consume() {
        let (pool, _dir) = test_pool().await;

        let id = save_challenge(&pool, None, ChallengePurpose::Authentication, b"state")
            .await
            .unwrap();

        let loaded = get_by_id(&pool, &id, ChallengePurpose::Authentication)
            .await
            .unwrap();
        assert_eq!(loaded.state, b"state");
        assert!(loaded.user_id.is_none());

        delete_challenge(&pool, &id).await.unwrap();
        let err = get_by_id(&pool, &id, ChallengePurpose::Authentication)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn purpose_mismatch_is_not_found() {
        let (pool, _dir) = test_pool().await;

        let id = save_challenge(&pool, None, ChallengePurpose::Authentication, b"x")
            .await
            .unwrap();

        let err = get_by_id(&pool, &id, ChallengePurpose::Registration)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn expired_challenge_is_rejected_and_reaped() {
        let (pool, _dir) = test_pool().await;

        let id = save_challenge(&pool, None, ChallengePurpose::Authentication, b"x")
            .await
            .unwrap();

        // Backdate past the 5-minute window.
        let past = (Utc::now() - chrono::Duration::minutes(6)).to_rfc3339();
        sqlx::query("UPDATE challenges SET expires_at = ? WHERE id = ?")
            .bind(&past)
            .bind(&id)
            .execute(&pool)
            .await
            .unwrap();

        let err = get_by_id(&pool, &id, ChallengePurpose::Authentication)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ChallengeExpired));

        cleanup_expired_challenges(&pool).await.unwrap();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM challenges")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn latest_challenge_wins_for_user() {
        let (pool, _dir) = test_pool().await;

        let user = crate::db::users::create_user(&pool, "a@example.com", "A", None)
            .await
            .unwrap();

        let first = save_challenge(&pool, Some(&user.id), ChallengePurpose::Registration, b"one")
            .await
            .unwrap();
        // Force a deterministic ordering between the two rows.
        sqlx::query("UPDATE challenges SET created_at = '2000-01-01T00:00:00+00:00' WHERE id = ?")
            .bind(&first)
            .execute(&pool)
            .await
            .unwrap();

        save_challenge(&pool, Some(&user.id), ChallengePurpose::Registration, b"two")
            .await
            .unwrap();

        let latest = get_latest_for_user(&pool, &user.id, ChallengePurpose::Registration)
            .await
            .unwrap();
        assert_eq!(latest.state, b"two");
    }
}
