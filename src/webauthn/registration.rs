//! # Passkey Registration Ceremony
//!
//! Server side of credential creation, in two steps:
//! 1. **Start**: build creation options with a fresh challenge, stash the
//!    ceremony state, hand the options to the client.
//! 2. **Finish**: verify the authenticator's attestation response against
//!    the stashed state and persist the new public key.
//!
//! Registration always runs for an already-authenticated user; which user
//! is never taken from the request body.

use crate::db::models::{ChallengePurpose, CredentialSummary, User};
use crate::db::{challenges, credentials};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use base64::prelude::*;
use serde_json::Value;
use sqlx::SqlitePool;
use webauthn_rs::prelude::*;

/// Name stored for a passkey when the client does not send one.
const DEFAULT_CREDENTIAL_NAME: &str = "Passkey";

/// Start the registration ceremony for a user.
///
/// ## Flow
/// 1. Load the user's existing credentials and build the exclusion list,
///    so an authenticator the user already registered refuses to create a
///    second credential for this RP.
/// 2. Ask the WebAuthn library for creation options + ceremony state.
/// 3. Store the serialized state as a registration challenge keyed to the
///    user, with the usual 5-minute expiry.
///
/// Returns the `CreationChallengeResponse` the client feeds to
/// `navigator.credentials.create()`.
pub async fn start_registration(
    state: &AppState,
    user: &User,
) -> AppResult<CreationChallengeResponse> {
    let user_uuid = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Internal("Invalid user UUID".to_string()))?;

    // Existing credential ids go into the exclusion list.
    let stored_creds = credentials::find_by_user_id(&state.db, &user.id).await?;
    let mut exclude: Vec<CredentialID> = Vec::new();
    for cred in &stored_creds {
        let passkey: Passkey = serde_json::from_slice(&cred.passkey_data)?;
        exclude.push(passkey.cred_id().clone());
    }
    let exclude = if exclude.is_empty() { None } else { Some(exclude) };

    let (ccr, reg_state) =
        state
            .webauthn
            .start_passkey_registration(user_uuid, &user.email, &user.full_name, exclude)?;

    // The ceremony state holds the challenge and expected RP parameters;
    // finish_registration needs it back verbatim.
    let state_bytes = serde_json::to_vec(&reg_state)?;
    challenges::save_challenge(
        &state.db,
        Some(&user.id),
        ChallengePurpose::Registration,
        &state_bytes,
    )
    .await?;

    Ok(ccr)
}

/// Finish the registration ceremony and persist the credential.
///
/// ## Flow
/// 1. Fetch the user's pending registration challenge (404 if they never
///    started one, 401 if it expired).
/// 2. Parse the client credential and verify it against the stored state;
///    the library checks the challenge, signature, RP ID and origin.
/// 3. Reject the credential id if it is already registered to anyone.
/// 4. Persist the serialized record with counter 0, then consume the
///    challenge so it cannot be replayed.
///
/// ## Errors
/// - `NotFound` / `ChallengeExpired`: no usable pending challenge
/// - `BadRequest`: credential JSON does not parse as a WebAuthn credential
/// - `WebAuthn`: attestation verification failed
/// - `DuplicateCredential`: credential id collision
pub async fn finish_registration(
    state: &AppState,
    user: &User,
    name: Option<&str>,
    credential: &Value,
) -> AppResult<CredentialSummary> {
    let challenge =
        challenges::get_latest_for_user(&state.db, &user.id, ChallengePurpose::Registration)
            .await?;

    let reg_state: PasskeyRegistration = serde_json::from_slice(&challenge.state)?;

    // Client-supplied JSON; a shape mismatch is their 400, not our 500.
    let reg_credential: RegisterPublicKeyCredential = serde_json::from_value(credential.clone())
        .map_err(|_| AppError::BadRequest("Malformed credential payload".to_string()))?;

    let passkey = state
        .webauthn
        .finish_passkey_registration(&reg_credential, &reg_state)?;

    let cred_id = BASE64_URL_SAFE_NO_PAD.encode(passkey.cred_id());
    check_unclaimed(&state.db, &cred_id).await?;

    let passkey_bytes = serde_json::to_vec(&passkey)?;
    let name = name.unwrap_or(DEFAULT_CREDENTIAL_NAME);

    // The backup flag columns are placeholders; the live values stay
    // inside the serialized record.
    credentials::save_credential(
        &state.db,
        &cred_id,
        &user.id,
        &passkey_bytes,
        0,
        name,
        false,
        false,
    )
    .await?;

    // Consume the challenge only after the credential is stored.
    challenges::delete_challenge(&state.db, &challenge.id).await?;

    let stored = credentials::find_by_credential_id(&state.db, &cred_id).await?;
    Ok(stored.into())
}

/// Credential ids are unique across ALL users. A collision with another
/// account is a protocol-level anomaly and must not silently rebind the
/// credential, so it is rejected before anything is written.
async fn check_unclaimed(pool: &SqlitePool, credential_id: &str) -> AppResult<()> {
    if credentials::exists(pool, credential_id).await? {
        return Err(AppError::DuplicateCredential);
    }
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
    async fn registering_a_known_credential_id_is_rejected() {
        let (pool, _dir) = test_pool().await;
        let user = crate::db::users::create_user(&pool, "a@example.com", "A", None)
            .await
            .unwrap();

        assert!(check_unclaimed(&pool, "cred-1").await.is_ok());

        credentials::save_credential(
            &pool, "cred-1", &user.id, b"record", 0, "Passkey", false, false,
        )
        .await
        .unwrap();

        let err = check_unclaimed(&pool, "cred-1").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateCredential));
        // Only the claimed id is refused.
        assert!(check_unclaimed(&pool, "cred-2").await.is_ok());
    }
}
