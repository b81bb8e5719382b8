//! # Middleware Module
//!
//! Cross-cutting request handling that runs before the route handlers.
//!
//! - `auth`: requires a valid access token on the protected routes and
//!   attaches the user it names to the request, so handlers can take it
//!   as an `Extension` instead of re-verifying the token themselves.

pub mod auth;
