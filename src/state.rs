//! # Application State
//!
//! Shared state handed to every request handler: the connection pool, the
//! WebAuthn instance and the configuration. Axum clones the state per
//! request, which is cheap because every field is a pool or an `Arc`.

use crate::config::Config;
use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use webauthn_rs::prelude::*;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// WebAuthn instance for building and verifying ceremonies.
    /// Configured once from the RP settings; immutable afterwards.
    pub webauthn: Arc<Webauthn>,

    /// Runtime configuration; the token layer reads the signing secret and
    /// lifetimes from here on every request.
    pub config: Arc<Config>,
}

impl AppState {
    /// Initialize application state.
    ///
    /// Connects the pool, applies the embedded migrations and builds the
    /// WebAuthn handle from the RP configuration.
    ///
    /// # Errors
    /// Fails if the database is unreachable, a migration fails, or the RP
    /// origin is not a valid URL.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = SqlitePool::connect(&config.database_url).await?;

        // Migrations are embedded from ./migrations at compile time and
        // tracked in the database, so re-running at startup is a no-op.
        sqlx::migrate!("./migrations").run(&db).await?;

        // The RP ID and origin must match where the app is served from;
        // ceremonies against a different origin fail verification.
        let rp_id = config.rp_id.clone();
        let rp_origin = Url::parse(&config.rp_origin)?;

        let builder = WebauthnBuilder::new(&rp_id, &rp_origin)?.rp_name(&config.rp_name);
        let webauthn = Arc::new(builder.build()?);

        Ok(AppState {
            db,
            webauthn,
            config: Arc::new(config.clone()),
        })
    }
}
