//! # Passkey Authentication Ceremony
//!
//! Login is usernameless by default: with no email hint the client may
//! answer with any discoverable credential for this RP, and the server
//! learns who is logging in from the assertion itself. With a hint the
//! challenge is restricted to that account's credentials.
//!
//! Because the two variants verify differently, the stored ceremony state
//! is tagged ([`AuthCeremonyState`]) and the verify call replays the right
//! one. The challenge travels by opaque id, since there may be no user to
//! key it on.
//!
//! Signature counters: an authenticator that supports a counter must report
//! a strictly larger value on every assertion. A repeated or lower value
//! means a second device holds the same private key, so the assertion is
//! rejected as possible cloning. Counter-less authenticators report zero
//! forever and are accepted at zero.

use crate::db::models::{ChallengePurpose, User};
use crate::db::{challenges, credentials, users};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use webauthn_rs::prelude::*;

/// Ceremony state stashed between the two halves of a login.
#[derive(Debug, Serialize, Deserialize)]
pub enum AuthCeremonyState {
    /// Usernameless ceremony; the credential identifies the user.
    Discoverable(DiscoverableAuthentication),
    /// Ceremony restricted to one user's registered credentials.
    AllowList(PasskeyAuthentication),
}

/// Start a login ceremony, optionally restricted to one account.
///
/// Returns the challenge id to round-trip through the client plus the
/// options for `navigator.credentials.get()`.
///
/// An unknown email answers with a generic 401 rather than admitting the
/// address is unregistered; a known account with no passkeys is a plain
/// 404, since that state is the caller's own.
pub async fn start_authentication(
    state: &AppState,
    email: Option<&str>,
) -> AppResult<(String, RequestChallengeResponse)> {
    let (rcr, ceremony, user_id) = match email {
        Some(email) => {
            let user = users::find_by_email(&state.db, email)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Authentication failed".to_string()))?;

            let stored_creds = credentials::find_by_user_id(&state.db, &user.id).await?;
            if stored_creds.is_empty() {
                return Err(AppError::NotFound(
                    "No passkeys registered for this account".to_string(),
                ));
            }

            let mut passkeys: Vec<Passkey> = Vec::new();
            for cred in &stored_creds {
                passkeys.push(serde_json::from_slice(&cred.passkey_data)?);
            }

            let (rcr, auth_state) = state.webauthn.start_passkey_authentication(&passkeys)?;
            (rcr, AuthCeremonyState::AllowList(auth_state), Some(user.id))
        }
        None => {
            let (rcr, disc_state) = state.webauthn.start_discoverable_authentication()?;
            (rcr, AuthCeremonyState::Discoverable(disc_state), None)
        }
    };

    let state_bytes = serde_json::to_vec(&ceremony)?;
    let challenge_id = challenges::save_challenge(
        &state.db,
        user_id.as_deref(),
        ChallengePurpose::Authentication,
        &state_bytes,
    )
    .await?;

    Ok((challenge_id, rcr))
}

/// Verify an assertion and return the authenticated user.
///
/// ## Flow
/// 1. Load the challenge by id (404 unknown, 401 expired).
/// 2. Find the stored credential named by the assertion's `rawId`.
/// 3. For a hinted challenge, require the credential to belong to the
///    hinted user.
/// 4. Replay the ceremony through the WebAuthn library, then apply the
///    counter policy against the stored column.
/// 5. Persist the updated record, consume the challenge, refuse disabled
///    accounts, stamp the login.
pub async fn finish_authentication(
    state: &AppState,
    challenge_id: &str,
    credential: &Value,
) -> AppResult<User> {
    let challenge =
        challenges::get_by_id(&state.db, challenge_id, ChallengePurpose::Authentication).await?;

    let ceremony: AuthCeremonyState = serde_json::from_slice(&challenge.state)?;

    let rsp: PublicKeyCredential = serde_json::from_value(credential.clone())
        .map_err(|_| AppError::BadRequest("Malformed credential payload".to_string()))?;

    // The assertion names the credential; its stored row names the owner.
    let cred_id = BASE64_URL_SAFE_NO_PAD.encode(&rsp.raw_id);
    let mut stored = credentials::find_by_credential_id(&state.db, &cred_id).await?;

    // A hinted challenge may only be answered by that user's credentials.
    if let Some(challenge_user) = &challenge.user_id {
        if challenge_user != &stored.user_id {
            return Err(AppError::Unauthorized(
                "Credential does not match this challenge".to_string(),
            ));
        }
    }

    let mut passkey: Passkey = serde_json::from_slice(&stored.passkey_data)?;

    let auth_result = match ceremony {
        AuthCeremonyState::AllowList(auth_state) => state
            .webauthn
            .finish_passkey_authentication(&rsp, &auth_state),
        AuthCeremonyState::Discoverable(disc_state) => {
            // Discoverable verification takes the owner's keys at finish
            // time; the allow-list variant captured them at start.
            let owner_creds = credentials::find_by_user_id(&state.db, &stored.user_id).await?;
            let mut keys: Vec<DiscoverableKey> = Vec::new();
            for cred in &owner_creds {
                let pk: Passkey = serde_json::from_slice(&cred.passkey_data)?;
                keys.push(DiscoverableKey::from(&pk));
            }
            state
                .webauthn
                .finish_discoverable_authentication(&rsp, disc_state, &keys)
        }
    }
    .map_err(|e| match e {
        // The library's own counter check trips here when the state it
        // captured already shows a regression.
        WebauthnError::CredentialPossibleCompromise => AppError::PossibleCloning,
        e => AppError::WebAuthn(e),
    })?;

    // The column is the counter as of the last *recorded* authentication;
    // it must move strictly forward regardless of what the ceremony state
    // happened to capture.
    check_counter(stored.counter as u32, auth_result.counter())?;

    // Fold the reported counter and backup state back into the record.
    if passkey.update_credential(&auth_result) == Some(true) {
        stored.passkey_data = serde_json::to_vec(&passkey)?;
    }
    credentials::record_authentication(
        &state.db,
        &stored.id,
        &stored.passkey_data,
        auth_result.counter(),
    )
    .await?;

    // The ceremony succeeded; the challenge is spent.
    challenges::delete_challenge(&state.db, &challenge.id).await?;

    let user = users::find_by_id(&state.db, &stored.user_id).await?;
    if !user.is_active {
        return Err(AppError::Forbidden("Account is disabled".to_string()));
    }
    users::record_login(&state.db, &user.id).await?;

    Ok(user)
}

/// Counter policy. Strictly greater passes; zero-on-zero passes, because an
/// authenticator without counter support reports zero on every assertion;
/// everything else is treated as a cloned credential.
fn check_counter(stored: u32, reported: u32) -> AppResult<()> {
    if reported == 0 && stored == 0 {
        return Ok(());
    }
    if reported > stored {
        return Ok(());
    }
    Err(AppError::PossibleCloning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_must_strictly_advance() {
        assert!(check_counter(5, 6).is_ok());
        assert!(check_counter(0, 1).is_ok());
        assert!(matches!(check_counter(5, 5), Err(AppError::PossibleCloning)));
        assert!(matches!(check_counter(5, 3), Err(AppError::PossibleCloning)));
        assert!(matches!(check_counter(5, 0), Err(AppError::PossibleCloning)));
    }

    #[test]
    fn counterless_authenticators_stay_at_zero() {
        assert!(check_counter(0, 0).is_ok());
    }
}
