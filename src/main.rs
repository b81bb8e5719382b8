//! Binary entry point: logging, configuration, state, background cleanup,
//! then the HTTP server. The router itself lives in the library crate.

use passkey_auth_api::config::Config;
use passkey_auth_api::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, filterable via RUST_LOG.
    // Default: info level for most crates, debug level for our app.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passkey_auth_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables and .env file.
    // Config's Debug impl redacts the JWT secret.
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    // Database pool, migrations, WebAuthn instance.
    let app_state = AppState::new(&config).await?;
    tracing::info!("Application state initialized");

    // Ceremony challenges expire after 5 minutes; sweep the leftovers so
    // abandoned ceremonies don't accumulate in the database.
    let cleanup_pool = app_state.db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            tracing::debug!("Running challenge cleanup task");
            if let Err(e) =
                passkey_auth_api::db::challenges::cleanup_expired_challenges(&cleanup_pool).await
            {
                tracing::error!("Challenge cleanup failed: {:?}", e);
            }
        }
    });

    let app = passkey_auth_api::router(app_state);

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
