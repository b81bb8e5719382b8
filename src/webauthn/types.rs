//! # WebAuthn API Types
//!
//! Request types for the four ceremony endpoints. Each ceremony is two
//! calls: generate-options hands the client a challenge, verify consumes
//! the client's signed response.
//!
//! The `credential` fields are raw JSON. The browser's credential objects
//! are deep WebAuthn structures; rather than mirroring every nested type we
//! accept them as `serde_json::Value` and let the WebAuthn library parse
//! and validate during verification.

use serde::{Deserialize, Serialize};

/// Request to complete passkey registration.
///
/// Sent after the user finishes the local ceremony (Face ID, fingerprint,
/// security key). The pending challenge is looked up from the
/// authenticated user, so only the credential itself travels back.
///
/// ## Example JSON
/// ```json
/// {
///   "name": "Work laptop",
///   "credential": { "id": "...", "rawId": "...", "response": { ... } }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterVerifyRequest {
    /// Optional friendly name for the new passkey
    pub name: Option<String>,

    /// The credential created by `navigator.credentials.create()`
    pub credential: serde_json::Value,
}

/// Request to start passkey authentication.
///
/// The body is optional on the wire. Without an email the ceremony is
/// usernameless: any discoverable credential for this RP may answer. With
/// an email hint the challenge is restricted to that account's passkeys.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticateOptionsRequest {
    pub email: Option<String>,
}

/// Request to complete passkey authentication.
///
/// `challenge_id` is the opaque id returned by generate-options; it pairs
/// this verify call with its stored ceremony state.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticateVerifyRequest {
    pub challenge_id: String,

    /// The assertion from `navigator.credentials.get()`
    pub credential: serde_json::Value,
}
