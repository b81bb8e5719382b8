//! # Configuration Management
//!
//! Configuration comes from environment variables (plus a local `.env` file
//! when present), 12-factor style.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `DATABASE_URL`: SQLite database connection string
//! - `RP_ID`: WebAuthn Relying Party ID (usually your domain)
//! - `RP_ORIGIN`: WebAuthn Relying Party Origin (full URL)
//! - `RP_NAME`: Human-readable name for your service
//! - `JWT_SECRET`: HS256 signing secret for tokens (required, no default)
//! - `ACCESS_TOKEN_EXPIRE_MINUTES`: Access token lifetime (default: 30)
//! - `REFRESH_TOKEN_EXPIRE_DAYS`: Refresh token lifetime (default: 7)

use anyhow::{Context, Result};
use std::env;

/// Application configuration.
///
/// ## WebAuthn Terminology
/// - **RP (Relying Party)**: the application relying on authentication
/// - **RP ID**: your domain name (e.g. "example.com" or "localhost")
/// - **RP Origin**: full URL the app is served from
///
/// The RP ID and origin are baked into every ceremony; credentials created
/// against one RP ID are unusable against another.
#[derive(Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// SQLite database connection URL
    /// Format: "sqlite:filename.db?mode=rwc" (read, write, create)
    pub database_url: String,

    /// WebAuthn Relying Party ID
    /// "localhost" for local development, the bare domain in production
    pub rp_id: String,

    /// WebAuthn Relying Party Origin, including protocol
    pub rp_origin: String,

    /// Application name shown to users during passkey creation
    pub rp_name: String,

    /// HS256 signing secret for access and refresh tokens.
    /// Required: there is no safe default for a signing key.
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    pub access_token_expire_minutes: i64,

    /// Refresh token lifetime in days
    pub refresh_token_expire_days: i64,
}

// Manual Debug so a logged config never prints the signing secret.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("rp_id", &self.rp_id)
            .field("rp_origin", &self.rp_origin)
            .field("rp_name", &self.rp_name)
            .field("jwt_secret", &"<redacted>")
            .field(
                "access_token_expire_minutes",
                &self.access_token_expire_minutes,
            )
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Reads `.env` first (missing file is fine), then each variable with
    /// its default. Fails if `JWT_SECRET` is unset or a numeric variable
    /// does not parse.
    ///
    /// ## Example .env file
    /// ```text
    /// HOST=127.0.0.1
    /// PORT=8080
    /// DATABASE_URL=sqlite:passkey_auth.db?mode=rwc
    /// RP_ID=localhost
    /// RP_ORIGIN=http://localhost:8080
    /// RP_NAME=Passkey Auth Demo
    /// JWT_SECRET=change-me
    /// ACCESS_TOKEN_EXPIRE_MINUTES=30
    /// REFRESH_TOKEN_EXPIRE_DAYS=7
    /// ```
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a number")?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:passkey_auth.db?mode=rwc".to_string()),

            rp_id: env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string()),

            rp_origin: env::var("RP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "Passkey Auth Demo".to_string()),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,

            access_token_expire_minutes: env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("ACCESS_TOKEN_EXPIRE_MINUTES must be a number")?,

            refresh_token_expire_days: env::var("REFRESH_TOKEN_EXPIRE_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("REFRESH_TOKEN_EXPIRE_DAYS must be a number")?,
        })
    }

    /// Socket address to bind the server to, e.g. "127.0.0.1:8080".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-wide, so everything env-related
    // lives in a single test to avoid races between parallel tests.
    #[test]
    fn from_env_requires_secret_and_applies_defaults() {
        env::remove_var("JWT_SECRET");
        env::remove_var("PORT");
        env::remove_var("ACCESS_TOKEN_EXPIRE_MINUTES");
        env::remove_var("REFRESH_TOKEN_EXPIRE_DAYS");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        env::set_var("JWT_SECRET", "test-secret");
        let config = Config::from_env().unwrap();
        assert!(!format!("{:?}", config).contains("test-secret"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.rp_id, "localhost");
        assert_eq!(config.access_token_expire_minutes, 30);
        assert_eq!(config.refresh_token_expire_days, 7);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");

        env::set_var("PORT", "not-a-number");
        assert!(Config::from_env().is_err());

        env::remove_var("PORT");
        env::remove_var("JWT_SECRET");
    }
}
