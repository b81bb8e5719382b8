//! # Access and Refresh Tokens
//!
//! Stateless HS256 JWTs. Every token carries the user id in `sub`, issue
//! and expiry timestamps, and a `type` claim separating the short-lived
//! access token from the longer-lived refresh token. No token state is kept
//! server-side: possession of a valid, unexpired token is the whole story,
//! and revocation before expiry is out of scope.
//!
//! The `type` claim is what stops a refresh token from being replayed as an
//! access token (and vice versa): both are signed with the same secret, so
//! without it they would be interchangeable.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Token kind, serialized into the `type` claim as "access" / "refresh".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token is bound to
    pub sub: String,

    /// Access or refresh
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Issued-at (unix seconds)
    pub iat: usize,

    /// Expiry (unix seconds)
    pub exp: usize,
}

/// What both login paths and the refresh endpoint hand back.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Issue a fresh access + refresh pair for a user.
pub fn issue_pair(config: &Config, user_id: &str) -> AppResult<TokenPair> {
    let access_token = issue(
        config,
        user_id,
        TokenType::Access,
        Duration::minutes(config.access_token_expire_minutes),
    )?;
    let refresh_token = issue(
        config,
        user_id,
        TokenType::Refresh,
        Duration::days(config.refresh_token_expire_days),
    )?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
    })
}

fn issue(config: &Config, user_id: &str, token_type: TokenType, ttl: Duration) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        token_type,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a token and require it to be of the expected kind.
///
/// Signature and expiry failures surface as `Token` (401); a well-formed
/// token of the wrong kind is rejected separately so an access token can
/// never drive the refresh endpoint.
pub fn verify(config: &Config, token: &str, expected: TokenType) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    if data.claims.token_type != expected {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            rp_id: "localhost".to_string(),
            rp_origin: "http://localhost:8080".to_string(),
            rp_name: "Test".to_string(),
            jwt_secret: "unit-test-secret".to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
        }
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let config = test_config();
        let pair = issue_pair(&config, "user-1").unwrap();

        let access = verify(&config, &pair.access_token, TokenType::Access).unwrap();
        assert_eq!(access.sub, "user-1");

        let refresh = verify(&config, &pair.refresh_token, TokenType::Refresh).unwrap();
        assert_eq!(refresh.sub, "user-1");
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn token_type_confusion_is_rejected() {
        let config = test_config();
        let pair = issue_pair(&config, "user-1").unwrap();

        let err = verify(&config, &pair.refresh_token, TokenType::Access).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = verify(&config, &pair.access_token, TokenType::Refresh).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let pair = issue_pair(&config, "user-1").unwrap();

        let mut other = test_config();
        other.jwt_secret = "a-different-secret".to_string();
        let err = verify(&other, &pair.access_token, TokenType::Access).unwrap_err();
        assert!(matches!(err, AppError::Token(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();

        // Validation keeps a small leeway, so back-date well past it.
        let now = Utc::now();
        let claims = Claims {
            sub: "user-1".to_string(),
            token_type: TokenType::Access,
            iat: (now - Duration::hours(2)).timestamp() as usize,
            exp: (now - Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        let err = verify(&config, &token, TokenType::Access).unwrap_err();
        assert!(matches!(err, AppError::Token(_)));
    }

    #[test]
    fn type_claim_uses_wire_names() {
        let config = test_config();
        let pair = issue_pair(&config, "user-1").unwrap();

        // Decode the payload segment directly to check the claim spelling.
        use base64::prelude::*;
        let payload = pair.access_token.split('.').nth(1).unwrap();
        let bytes = BASE64_URL_SAFE_NO_PAD.decode(payload).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "access");
        assert_eq!(value["sub"], "user-1");
    }
}
