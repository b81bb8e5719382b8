//! # User Handlers
//!
//! Profile read and partial update for the authenticated user.

use crate::db::models::{CredentialSummary, User, UserPublic};
use crate::db::{credentials, users};
use crate::error::{AppError, AppResult};
use crate::password;
use crate::state::AppState;
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

/// Profile payload: the user's public fields plus credential metadata.
///
/// Credential entries carry the friendly name and timestamps only. The
/// public key, the serialized passkey record and the signature counter
/// never leave the server.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserPublic,
    pub credentials: Vec<CredentialSummary>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

/// Get the authenticated user's profile.
///
/// ## Route
/// GET /user/profile (Bearer access token required)
///
/// ## Response
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "email": "alice@example.com",
///   "full_name": "Alice Smith",
///   "is_active": true,
///   "last_login_at": "2024-01-15T10:30:00Z",
///   "created_at": "2024-01-15T10:30:00Z",
///   "updated_at": "2024-01-15T10:30:00Z",
///   "credentials": [
///     { "id": "…", "name": "YubiKey", "created_at": "…", "last_used_at": null }
///   ]
/// }
/// ```
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> AppResult<Json<ProfileResponse>> {
    let creds = credentials::find_by_user_id(&state.db, &user.id).await?;

    Ok(Json(ProfileResponse {
        user: user.into(),
        credentials: creds.into_iter().map(Into::into).collect(),
    }))
}

/// Partially update the authenticated user's profile.
///
/// ## Route
/// PATCH /user/profile (Bearer access token required)
///
/// Fields left out of the body keep their current value. A new email is
/// re-checked for uniqueness; a new password is re-hashed before storage.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    if let Some(email) = &req.email {
        if !email.contains('@') {
            return Err(AppError::BadRequest("Invalid email address".to_string()));
        }
        if email != &user.email && users::find_by_email(&state.db, email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
    }

    let password_hash = match &req.password {
        Some(pw) => {
            if pw.len() < password::MIN_PASSWORD_LEN {
                return Err(AppError::BadRequest(format!(
                    "Password must be at least {} characters",
                    password::MIN_PASSWORD_LEN
                )));
            }
            Some(password::hash_password(pw)?)
        }
        None => None,
    };

    let updated = users::update_profile(
        &state.db,
        &user.id,
        req.email.as_deref(),
        req.full_name.as_deref(),
        password_hash.as_deref(),
    )
    .await?;

    let creds = credentials::find_by_user_id(&state.db, &user.id).await?;

    Ok(Json(ProfileResponse {
        user: updated.into(),
        credentials: creds.into_iter().map(Into::into).collect(),
    }))
}
