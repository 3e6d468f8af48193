//! Practice API gateway - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Connect the rate limit store (or disable rate limiting)
//! 5. Build HTTP router with routes and the API key guard
//! 6. Start server on configured port

use std::sync::Arc;

use practice_api_gateway::{
    AppState, build_router, config,
    db::{self, PgApiKeyStore, PgLocationStore},
    middleware::auth::ApiGuard,
    services::{
        api_key_service::ApiKeyService, authenticator::Authenticator, rate_limiter::RateLimiter,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Constructed once here and shared by every request
    let rate_limiter = RateLimiter::from_config(&config).await;

    let api_keys = Arc::new(PgApiKeyStore::new(pool.clone()));
    let locations = Arc::new(PgLocationStore::new(pool));

    let state = AppState {
        api_keys: api_keys.clone(),
        locations,
        api_key_service: ApiKeyService::from_config(api_keys.clone(), &config),
        rate_limiting_enabled: rate_limiter.is_enabled(),
    };
    let guard = ApiGuard::new(
        Authenticator::new(api_keys, rate_limiter),
        config.pagination(),
    );

    let app = build_router(state, &guard);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
