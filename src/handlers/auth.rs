use crate::db::models::{User, UserPublic};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::password;
use crate::state::AppState;
use crate::tokens::{self, TokenPair, TokenType};
use crate::webauthn::types::*;
use crate::webauthn::{authentication, registration};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    /// Absent for passkey-only accounts.
    pub password: Option<String>,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// Password + token endpoints

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<UserPublic>)> {
    // Minimal shape check only.
    if !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
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

    if users::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let user = users::create_user(&state.db, &req.email, &req.full_name, password_hash).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    // Unknown email, passkey-only account and wrong password all take this
    // same exit, so the response never says which one happened.
    let user = users::find_by_email(&state.db, &req.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredentials)?;
    if !password::verify_password(&req.password, hash)? {
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Account is disabled".to_string()));
    }

    users::record_login(&state.db, &user.id).await?;
    let pair = tokens::issue_pair(&state.config, &user.id)?;

    Ok(Json(pair))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let claims = tokens::verify(&state.config, &req.refresh_token, TokenType::Refresh)?;

    // The subject must still exist and be live before new tokens go out.
    let user = match users::find_by_id(&state.db, &claims.sub).await {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::Unauthorized("User no longer exists".to_string()))
        }
        Err(e) => return Err(e),
    };
    if !user.is_active {
        return Err(AppError::Forbidden("Account is disabled".to_string()));
    }

    let pair = tokens::issue_pair(&state.config, &user.id)?;

    Ok(Json(pair))
}

// Passkey registration endpoints (authenticated)

pub async fn register_options(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> AppResult<Json<Value>> {
    let ccr = registration::start_registration(&state, &user).await?;

    Ok(Json(json!(ccr)))
}

pub async fn register_verify(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<RegisterVerifyRequest>,
) -> AppResult<Json<Value>> {
    let summary =
        registration::finish_registration(&state, &user, req.name.as_deref(), &req.credential)
            .await?;

    Ok(Json(json!({
        "success": true,
        "credential": summary
    })))
}

// Passkey authentication endpoints (public)

/// Serves both GET (no body) and POST (optional `{ "email": … }` hint).
/// A body that is missing or fails to parse means a usernameless ceremony.
pub async fn authenticate_options(
    State(state): State<AppState>,
    body: Option<Json<AuthenticateOptionsRequest>>,
) -> AppResult<Json<Value>> {
    let email = body.as_ref().and_then(|Json(req)| req.email.as_deref());

    let (challenge_id, rcr) = authentication::start_authentication(&state, email).await?;

    Ok(Json(json!({
        "challenge_id": challenge_id,
        "options": rcr
    })))
}

pub async fn authenticate_verify(
    State(state): State<AppState>,
    Json(req): Json<AuthenticateVerifyRequest>,
) -> AppResult<Json<TokenPair>> {
    let user = authentication::finish_authentication(&state, &req.challenge_id, &req.credential)
        .await?;

    let pair = tokens::issue_pair(&state.config, &user.id)?;

    Ok(Json(pair))
}
