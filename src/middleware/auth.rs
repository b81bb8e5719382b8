use crate::db::users;
use crate::error::AppError;
use crate::state::AppState;
use crate::tokens::{self, TokenType};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

/// Require a valid `Bearer` access token and attach the user it names.
///
/// Refresh tokens are refused here; they are only good for `/auth/refresh`.
/// On success the loaded [`crate::db::models::User`] is inserted into the
/// request extensions, so protected handlers take it as `Extension<User>`
/// instead of re-verifying the token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let claims = tokens::verify(&state.config, token, TokenType::Access)?;

    // The subject is a user id. A token can outlive its account, so the
    // row must still exist and be live.
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

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
