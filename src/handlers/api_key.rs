//! Introspection of the calling API key.
//!
//! - GET /api/v1/api-key - Who am I, and what may I do?

use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    middleware::auth::ApiContext,
    models::{scope::Scope, tenant::Location},
};

#[derive(Debug, Serialize)]
pub struct ApiKeyInfoResponse {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub tenant: TenantSummary,
    pub location: Option<Location>,
    pub scopes: Vec<Scope>,
    pub rate_limit_per_hour: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Describe the key used for this request.
///
/// # Endpoint
///
/// `GET /api/v1/api-key`
///
/// # Authentication
///
/// Any valid key; no scope required. Only scopes this build knows are listed.
pub async fn get_current_api_key(Extension(ctx): Extension<ApiContext>) -> Json<ApiKeyInfoResponse> {
    let principal = &ctx.api_key;

    Json(ApiKeyInfoResponse {
        id: principal.key.id,
        name: principal.key.name.clone(),
        key_prefix: principal.key.key_prefix.clone(),
        tenant: TenantSummary {
            id: principal.tenant.id,
            name: principal.tenant.name.clone(),
            slug: principal.tenant.slug.clone(),
        },
        location: principal.location.clone(),
        scopes: principal.scopes.to_vec(),
        rate_limit_per_hour: principal.key.rate_limit_per_hour,
        expires_at: principal.key.expires_at,
    })
}
