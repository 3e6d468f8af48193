//! Test application setup utilities
//!
//! Builds the real router over in-memory stores, plus a few probe routes that
//! exercise guard requirements the production routes do not use.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use axum::{
    Extension, Json, Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use practice_api_gateway::{
    AppState, build_router,
    middleware::auth::{ApiContext, ApiGuard, RouteRequirements},
    models::{pagination::PaginationOptions, scope::Scope},
    services::{
        api_key_service::ApiKeyService,
        authenticator::Authenticator,
        rate_limiter::{MemoryCounterStore, RateLimiter},
    },
};

use super::{KeyFixture, MemoryStore};

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,

    /// The issuance service the application state holds
    pub api_key_service: ApiKeyService,

    /// Times a probe handler actually ran
    pub handler_calls: Arc<AtomicUsize>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    /// Rate limiting backed by an in-memory counter store.
    pub fn new() -> Self {
        Self::with_rate_limiter(RateLimiter::with_store(
            Arc::new(MemoryCounterStore::new()),
            "test:api-v1",
        ))
    }

    /// No counter store configured.
    pub fn without_rate_limiting() -> Self {
        Self::with_rate_limiter(RateLimiter::disabled())
    }

    pub fn with_rate_limiter(rate_limiter: RateLimiter) -> Self {
        let store = MemoryStore::new();
        let handler_calls = Arc::new(AtomicUsize::new(0));

        let api_key_service = ApiKeyService::new(Arc::new(store.clone()), 1000);
        let state = AppState {
            api_keys: Arc::new(store.clone()),
            locations: Arc::new(store.clone()),
            api_key_service: api_key_service.clone(),
            rate_limiting_enabled: rate_limiter.is_enabled(),
        };
        let guard = ApiGuard::new(
            Authenticator::new(Arc::new(store.clone()), rate_limiter),
            PaginationOptions::default(),
        );

        let router = build_router(state, &guard).merge(probe_routes(&guard, handler_calls.clone()));

        Self {
            router,
            store,
            api_key_service,
            handler_calls,
        }
    }

    pub fn add_key(&self, fixture: &KeyFixture) {
        self.store.add_key(fixture.key.clone());
    }

    pub fn handler_calls(&self) -> usize {
        self.handler_calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, uri: &str, authorization: Option<&str>) -> TestResponse {
        self.request("GET", uri, authorization).await
    }

    pub async fn post(&self, uri: &str, authorization: Option<&str>) -> TestResponse {
        self.request("POST", uri, authorization).await
    }

    async fn request(&self, method: &str, uri: &str, authorization: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Routes standing in for business handlers.
fn probe_routes(guard: &ApiGuard, calls: Arc<AtomicUsize>) -> Router {
    let echo = {
        let calls = calls.clone();
        move |Extension(ctx): Extension<ApiContext>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "tenantId": ctx.tenant_id(),
                    "locationId": ctx.location_id,
                    "limit": ctx.pagination.limit,
                    "offset": ctx.pagination.offset,
                }))
            }
        }
    };

    Router::new()
        .route(
            "/probe/pets",
            guard.protect(
                get(echo.clone()),
                RouteRequirements::new().scope(Scope::ReadPets),
            ),
        )
        .route(
            "/probe/pets/write",
            guard.protect(
                post(echo.clone()),
                RouteRequirements::new().scope(Scope::WritePets),
            ),
        )
        .route(
            "/probe/appointments",
            guard.protect(
                get(echo),
                RouteRequirements::new()
                    .scope(Scope::ReadAppointments)
                    .require_location(),
            ),
        )
        .route(
            "/probe/crash",
            guard.protect(
                get(|| async {
                    if true {
                        panic!("inventory ledger out of sync");
                    }
                    StatusCode::OK
                }),
                RouteRequirements::new(),
            ),
        )
}
