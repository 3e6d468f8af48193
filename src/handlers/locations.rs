//! Location endpoints.
//!
//! - GET /api/v1/locations - List the tenant's locations
//! - GET /api/v1/locations/{id} - Get one location
//!
//! Both require `read:locations`. A location-scoped key only ever sees its
//! own location.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    middleware::auth::ApiContext,
    models::{pagination::PaginatedResponse, tenant::Location},
};

/// List locations for the authenticated tenant.
///
/// # Query Parameters
///
/// - `locationId` - narrow to one location (ignored for location-scoped keys)
/// - `limit`, `offset` - pagination
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "data": [{ "id": "...", "tenant_id": "...", "name": "Downtown Clinic", ... }],
///   "meta": { "total": 1, "limit": 50, "offset": 0, "hasMore": false }
/// }
/// ```
pub async fn list_locations(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiContext>,
) -> Result<Json<PaginatedResponse<Location>>, AppError> {
    let (locations, total) = state
        .locations
        .list(ctx.tenant_id(), ctx.location_id, ctx.pagination)
        .await?;

    Ok(Json(PaginatedResponse::new(locations, total, ctx.pagination)))
}

/// Get a location by ID.
///
/// Returns 404 when the location belongs to another tenant, or lies outside
/// the key's own location.
pub async fn get_location(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiContext>,
    Path(location_id): Path<String>,
) -> Result<Json<Location>, AppError> {
    let location_id = Uuid::parse_str(&location_id)
        .map_err(|_| AppError::bad_request("Invalid location id"))?;

    if ctx.api_key.location_id().is_some_and(|own| own != location_id) {
        return Err(AppError::not_found("Location not found"));
    }

    let location = state
        .locations
        .get(ctx.tenant_id(), location_id)
        .await?
        .ok_or_else(|| AppError::not_found("Location not found"))?;

    Ok(Json(location))
}
