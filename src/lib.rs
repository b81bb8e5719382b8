//! # Passkey Auth API
//!
//! A demonstration authentication backend with two login paths, classic
//! email/password and WebAuthn passkeys, in front of a JWT-protected
//! profile endpoint. Persistence is SQLite via sqlx, with migrations
//! applied at startup.
//!
//! ## Key Concepts
//! - **WebAuthn**: Web Authentication API for passwordless authentication
//! - **Passkeys**: User-friendly implementation of WebAuthn credentials
//! - **Access/refresh tokens**: short-lived HS256 JWTs plus a longer-lived
//!   refresh token, rotated together
//!
//! ## Route Map
//! Public:
//! - `GET  /health`
//! - `POST /auth/register` (email/password signup)
//! - `POST /auth/login` (password login, returns a token pair)
//! - `POST /auth/refresh` (refresh token, returns a rotated pair)
//! - `GET|POST /auth/webauthn/authenticate/generate-options`
//! - `POST /auth/webauthn/authenticate/verify`
//!
//! Bearer access token required:
//! - `POST /auth/webauthn/register/generate-options`
//! - `POST /auth/webauthn/register/verify`
//! - `GET  /user/profile`
//! - `PATCH /user/profile`

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod state;
pub mod tokens;
pub mod webauthn;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::auth::*;
use crate::handlers::health::health_check;
use crate::handlers::users::{get_profile, update_profile};
use crate::state::AppState;

/// Crate version, reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the application router over the given state.
///
/// Kept separate from `main` so integration tests can drive the full
/// router in-process without binding a socket.
pub fn router(app_state: AppState) -> Router {
    // Routes behind the access-token middleware. Registering a passkey is
    // deliberately an authenticated operation: the account must already
    // exist, created via signup or an earlier passkey.
    let protected_routes = Router::new()
        .route(
            "/auth/webauthn/register/generate-options",
            post(register_options),
        )
        .route("/auth/webauthn/register/verify", post(register_verify))
        .route("/user/profile", get(get_profile).patch(update_profile))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::require_auth,
        ));

    // CORS is wide open; this is a demo backend meant to be called from a
    // locally-served frontend.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check endpoint, useful for monitoring and load balancers
        .route("/health", get(health_check))
        // Account + token endpoints
        .route("/auth/register", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        // Passkey login flow. GET serves the usernameless ceremony;
        // POST accepts an optional email hint in the body.
        .route(
            "/auth/webauthn/authenticate/generate-options",
            get(authenticate_options).post(authenticate_options),
        )
        .route("/auth/webauthn/authenticate/verify", post(authenticate_verify))
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
