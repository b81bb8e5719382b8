//! # Database Models
//!
//! Row structs for the three tables (`users`, `credentials`, `challenges`)
//! plus the public projections returned by the API.
//!
//! Timestamps are stored as RFC3339 text because SQLite keeps them as TEXT
//! anyway; ids are UUID v4 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account.
///
/// `password_hash` is `None` for passkey-only accounts: such users can never
/// log in with a password, only with a registered credential.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Unique email address, used for login and lookup
    pub email: String,

    /// Argon2 hash of the password, absent for passkey-only accounts
    pub password_hash: Option<String>,

    /// Human-readable display name
    pub full_name: String,

    /// Disabled accounts keep their rows but cannot log in
    pub is_active: bool,

    /// Last successful login (either path), RFC3339
    pub last_login_at: Option<String>,

    /// When the account was created (RFC3339 timestamp)
    pub created_at: String,

    /// When the account was last updated (RFC3339 timestamp)
    pub updated_at: String,
}

impl User {
    /// Create a new user with generated ID and timestamps.
    pub fn new(email: String, full_name: String, password_hash: Option<String>) -> Self {
        let now = Utc::now().to_rfc3339();

        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            full_name,
            is_active: true,
            last_login_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Public view of a [`User`], safe to return from the API.
///
/// Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserPublic {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Passkey credential stored for a user.
///
/// `passkey_data` is the whole serialized public-key record from the WebAuthn
/// library: the public key, the signature counter and the metadata needed to
/// verify future assertions. Only the public half ever reaches the server;
/// the private key stays on the authenticator.
///
/// The `counter` column mirrors the counter inside `passkey_data` so the
/// cloning check can read it without deserializing the blob. It must never
/// decrease across successful authentications.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PasskeyCredential {
    /// Base64url-encoded credential id, unique across all users
    pub id: String,

    /// Owning user, foreign key to `users`
    pub user_id: String,

    /// Serialized public-key record (BLOB)
    pub passkey_data: Vec<u8>,

    /// Signature counter as of the last successful authentication
    pub counter: i64,

    /// Friendly name shown in the user's profile
    pub name: String,

    /// Whether the credential can be synced across devices
    pub backup_eligible: bool,

    /// Whether the credential is currently backed up
    pub backup_state: bool,

    /// When the credential was registered (RFC3339 timestamp)
    pub created_at: String,

    /// Last successful authentication with this credential
    pub last_used_at: Option<String>,
}

/// Public metadata for a registered credential.
///
/// This is all the profile endpoint exposes: no key material, no counter.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

impl From<PasskeyCredential> for CredentialSummary {
    fn from(cred: PasskeyCredential) -> Self {
        Self {
            id: cred.id,
            name: cred.name,
            created_at: cred.created_at,
            last_used_at: cred.last_used_at,
        }
    }
}

/// Which half of which ceremony a stored challenge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePurpose {
    Registration,
    Authentication,
}

impl ChallengePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengePurpose::Registration => "registration",
            ChallengePurpose::Authentication => "authentication",
        }
    }
}

/// Pending WebAuthn ceremony.
///
/// Created by a generate-options call and consumed exactly once by the
/// matching verify call. `state` is the serialized server-side ceremony
/// state; `user_id` is `None` for usernameless authentication.
///
/// Challenges expire after 5 minutes. Reads reject expired rows and a
/// background task deletes them, so a stolen challenge is only useful for a
/// short window.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Challenge {
    /// Unique challenge identifier (UUID)
    pub id: String,

    /// User the ceremony is bound to, if known at start time
    pub user_id: Option<String>,

    /// "registration" or "authentication"
    pub purpose: String,

    /// Serialized ceremony state (BLOB)
    pub state: Vec<u8>,

    /// When the challenge was created (RFC3339 timestamp)
    pub created_at: String,

    /// When the challenge expires (RFC3339 timestamp)
    pub expires_at: String,
}

impl Challenge {
    /// Create a new challenge expiring 5 minutes from now.
    pub fn new(user_id: Option<String>, purpose: ChallengePurpose, state: Vec<u8>) -> Self {
        let now = Utc::now();
        let expires = now + chrono::Duration::minutes(5);

        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            purpose: purpose.as_str().to_string(),
            state,
            created_at: now.to_rfc3339(),
            expires_at: expires.to_rfc3339(),
        }
    }

    /// Whether the expiry timestamp is in the past.
    pub fn is_expired(&self) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => Utc::now() > expires_at,
            // An unparseable expiry is treated as expired rather than eternal.
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active_with_matching_timestamps() {
        let user = User::new("a@example.com".into(), "A".into(), None);
        assert!(user.is_active);
        assert!(user.password_hash.is_none());
        assert_eq!(user.created_at, user.updated_at);
        Uuid::parse_str(&user.id).unwrap();
    }

    #[test]
    fn user_public_never_serializes_password_hash() {
        let user = User::new("a@example.com".into(), "A".into(), Some("$argon2id$x".into()));
        let public = UserPublic::from(user);
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn fresh_challenge_is_not_expired() {
        let ch = Challenge::new(None, ChallengePurpose::Authentication, vec![1, 2, 3]);
        assert!(!ch.is_expired());
        assert_eq!(ch.purpose, "authentication");
        assert!(ch.user_id.is_none());
    }

    #[test]
    fn backdated_challenge_is_expired() {
        let mut ch = Challenge::new(Some("u1".into()), ChallengePurpose::Registration, vec![]);
        ch.expires_at = (Utc::now() - chrono::Duration::minutes(1)).to_rfc3339();
        assert!(ch.is_expired());
    }
}
