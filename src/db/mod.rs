//! # Database Module
//!
//! One submodule per table:
//! - `models`: row structs and public projections
//! - `users`: user accounts
//! - `credentials`: registered passkey credentials
//! - `challenges`: pending WebAuthn ceremonies (both purposes, one table)

pub mod challenges;
pub mod credentials;
pub mod models;
pub mod users;
