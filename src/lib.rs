//! Practice API gateway.
//!
//! Public REST API (v1) of the veterinary practice platform, guarded by
//! capability-scoped, tenant- and location-isolated, rate-limited API keys.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API keys, SHA-256 hashed at rest, per-route scopes
//! - **Rate limiting**: per-key sliding hourly window in Redis (optional)

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    db::{ApiKeyStore, LocationStore},
    middleware::auth::{ApiGuard, RouteRequirements},
    models::scope::Scope,
    services::api_key_service::ApiKeyService,
};

/// Shared state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub locations: Arc<dyn LocationStore>,

    /// Issuance and lifecycle for the tenant management surface
    pub api_key_service: ApiKeyService,

    pub rate_limiting_enabled: bool,
}

/// API v1 routes, each wrapped by the guard with its own requirements.
pub fn api_v1_routes(guard: &ApiGuard) -> Router<AppState> {
    let read_locations = RouteRequirements::new().scope(Scope::ReadLocations);

    Router::new()
        .route(
            "/api/v1/api-key",
            guard.protect(
                get(handlers::api_key::get_current_api_key),
                RouteRequirements::new(),
            ),
        )
        .route(
            "/api/v1/locations",
            guard.protect(get(handlers::locations::list_locations), read_locations),
        )
        .route(
            "/api/v1/locations/{id}",
            guard.protect(get(handlers::locations::get_location), read_locations),
        )
}

/// Full application router: public routes plus guarded API v1 routes.
pub fn build_router(state: AppState, guard: &ApiGuard) -> Router {
    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .merge(api_v1_routes(guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
