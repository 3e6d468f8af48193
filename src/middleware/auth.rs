//! API key guard for API v1 routes.
//!
//! This middleware is the only place handlers meet authentication. For every
//! guarded request it:
//! 1. Authenticates the `Authorization` header (key, liveness, rate limit)
//! 2. Enforces the route's required scope
//! 3. Resolves the effective location and enforces the location requirement
//! 4. Parses pagination parameters
//! 5. Injects [`ApiContext`] into the request and runs the handler
//! 6. Adds `X-RateLimit-*` headers to whatever the handler returned

use std::{panic::AssertUnwindSafe, sync::Arc};

use axum::{
    extract::{Query, Request, State},
    http::{HeaderValue, Uri, header::AUTHORIZATION},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use futures::FutureExt;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        api_key::Principal,
        pagination::{Pagination, PaginationOptions, parse_pagination_params},
        scope::Scope,
    },
    services::{
        authenticator::Authenticator,
        rate_limiter::{
            RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER,
            RateLimitDecision,
        },
    },
};

/// Per-request context handed to guarded handlers.
///
/// Extract it with `Extension<ApiContext>`.
#[derive(Debug, Clone)]
pub struct ApiContext {
    /// The authenticated key with its tenant and optional location
    pub api_key: Principal,

    /// Location to filter on: the key's own location when it is
    /// location-scoped, otherwise the client's `locationId` (if any)
    pub location_id: Option<Uuid>,

    pub pagination: Pagination,
}

impl ApiContext {
    pub fn tenant_id(&self) -> Uuid {
        self.api_key.tenant_id()
    }
}

/// What a route demands beyond a valid key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRequirements {
    pub scope: Option<Scope>,
    pub require_location: bool,
}

impl RouteRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn require_location(mut self) -> Self {
        self.require_location = true;
        self
    }
}

/// Builds guarded routes. Cloned into every route it protects.
#[derive(Clone)]
pub struct ApiGuard {
    authenticator: Arc<Authenticator>,
    pagination: PaginationOptions,
}

impl ApiGuard {
    pub fn new(authenticator: Authenticator, pagination: PaginationOptions) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            pagination,
        }
    }

    /// Wrap every method of `route` with the guard.
    ///
    /// ```ignore
    /// .route(
    ///     "/api/v1/locations",
    ///     guard.protect(get(locations::list_locations), RouteRequirements::new().scope(Scope::ReadLocations)),
    /// )
    /// ```
    pub fn protect<S>(&self, route: MethodRouter<S>, requirements: RouteRequirements) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let state = GuardedRoute {
            guard: self.clone(),
            requirements,
        };
        route.route_layer(from_fn_with_state(state, api_key_guard))
    }
}

#[derive(Clone)]
struct GuardedRoute {
    guard: ApiGuard,
    requirements: RouteRequirements,
}

/// Raw query parameters the guard cares about. Handlers may read others.
#[derive(Debug, Default, PartialEq, Eq)]
struct GuardQuery {
    location_id: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

impl GuardQuery {
    /// Read the query as plain pairs so a repeated or odd parameter cannot
    /// hide the others. The first occurrence of each name wins.
    fn from_uri(uri: &Uri) -> Self {
        let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();

        let mut query = GuardQuery::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "locationId" => &mut query.location_id,
                "limit" => &mut query.limit,
                "offset" => &mut query.offset,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

async fn api_key_guard(
    State(route): State<GuardedRoute>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let authentication = match route
        .guard
        .authenticator
        .authenticate(authorization.as_deref())
        .await
    {
        Ok(authentication) => authentication,
        Err(err) => return err.into_response(),
    };
    let rate_limit = authentication.rate_limit;

    let context = match build_context(&route, authentication.principal, &request) {
        Ok(context) => context,
        Err(err) => return with_rate_limit_headers(err.into_response(), rate_limit),
    };

    tracing::debug!(
        api_key_id = %context.api_key.key.id,
        tenant_id = %context.tenant_id(),
        location_id = ?context.location_id,
        "API request authorized"
    );
    request.extensions_mut().insert(context);

    let response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            AppError::internal(message).into_response()
        }
    };

    with_rate_limit_headers(response, rate_limit)
}

/// Scope, location and pagination checks after the key is known.
fn build_context(
    route: &GuardedRoute,
    api_key: Principal,
    request: &Request,
) -> Result<ApiContext, AppError> {
    if let Some(scope) = route.requirements.scope {
        if !api_key.has_scope(scope) {
            return Err(AppError::forbidden(format!("Missing required scope: {scope}")));
        }
    }

    let query = GuardQuery::from_uri(request.uri());

    // A location-scoped key always wins over the query string.
    let location_id = match api_key.location_id() {
        Some(location_id) => Some(location_id),
        None => parse_location_param(query.location_id.as_deref())?,
    };

    if route.requirements.require_location && location_id.is_none() {
        return Err(AppError::bad_request(
            "locationId is required for this endpoint",
        ));
    }

    let pagination = parse_pagination_params(
        query.limit.as_deref(),
        query.offset.as_deref(),
        route.guard.pagination,
    );

    Ok(ApiContext {
        api_key,
        location_id,
        pagination,
    })
}

fn parse_location_param(raw: Option<&str>) -> Result<Option<Uuid>, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| AppError::bad_request("Invalid locationId")),
    }
}

fn with_rate_limit_headers(mut response: Response, decision: Option<RateLimitDecision>) -> Response {
    if let Some(decision) = decision {
        let headers = response.headers_mut();
        headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(decision.limit));
        headers.insert(
            RATE_LIMIT_REMAINING_HEADER,
            HeaderValue::from(decision.remaining),
        );
        headers.insert(
            RATE_LIMIT_RESET_HEADER,
            HeaderValue::from(decision.reset_at_ms),
        );
    }
    response
}
