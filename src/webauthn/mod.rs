//! # WebAuthn Module
//!
//! Passkey ceremonies, each split into a generate-options half and a
//! verify half with the server-side state persisted between them.
//!
//! ## Submodules
//! - `types`: Request types for the ceremony endpoints
//! - `registration`: Adding a passkey to an authenticated account
//! - `authentication`: Logging in with a passkey
//!
//! ## Ceremony shape
//!
//! ### Registration (adding a passkey)
//! 1. An authenticated client asks for options → `registration::start_registration()`
//! 2. Server issues a challenge excluding already-registered credentials
//! 3. Client creates the credential with its authenticator
//! 4. Client posts it back → `registration::finish_registration()`
//! 5. Server verifies and stores the new credential
//!
//! ### Authentication (logging in)
//! 1. Client asks for options, with or without an email hint →
//!    `authentication::start_authentication()`
//! 2. Server issues a challenge and a challenge id to round-trip
//! 3. Client signs with its authenticator
//! 4. Client posts assertion plus challenge id → `authentication::finish_authentication()`
//! 5. Server verifies the signature and counter, then issues tokens

pub mod authentication;
pub mod registration;
pub mod types;
