//! # HTTP Request Handlers
//!
//! This module contains all the HTTP route handlers (controllers).
//! Each handler processes a specific API endpoint.
//!
//! ## Submodules
//! - `health`: Health check endpoint (for monitoring)
//! - `auth`: Signup, password login, token refresh, passkey ceremonies
//! - `users`: Profile read and update for the authenticated user
//!
//! ## Handler Pattern
//! Handlers are async functions that:
//! 1. Extract data from the request (JSON body, bearer-authenticated user)
//! 2. Call the business logic (database operations, ceremonies, tokens)
//! 3. Return a response (JSON, status code)

pub mod auth;
pub mod health;
pub mod users;
