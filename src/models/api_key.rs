//! API Key model for authentication.
//!
//! API keys authenticate third-party integrations against the public API v1.
//! Only a SHA-256 hash of the key is stored; the plaintext is shown once,
//! when the key is issued.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    scope::{GrantedScopes, Scope, ScopeBundle},
    tenant::{Location, Tenant},
};

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. `deleted_at` is not part of the model:
/// soft-deleted rows are never loaded.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApiKey {
    /// Unique identifier for this API key
    pub id: Uuid,

    /// Owning tenant, never changes after issuance
    pub tenant_id: Uuid,

    /// When set, every request made with this key is confined to this location
    pub location_id: Option<Uuid>,

    /// Label chosen when the key was issued
    pub name: String,

    /// SHA-256 hash of the full key (64 hex characters)
    pub key_hash: String,

    /// Non-secret prefix (`vpm_1a2b3c4d`) shown in the dashboard
    pub key_prefix: String,

    /// Scope identifiers as persisted; may contain strings unknown to this build
    pub scopes: Vec<String>,

    /// Hourly request quota for this key
    pub rate_limit_per_hour: i32,

    /// Inactive keys are rejected during authentication. This provides a way to revoke access without deleting the record.
    pub is_active: bool,

    pub expires_at: Option<DateTime<Utc>>,

    /// Best-effort; written asynchronously after successful authentication
    pub last_used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Quota as used by the rate limiter (never zero).
    pub fn hourly_limit(&self) -> u32 {
        u32::try_from(self.rate_limit_per_hour).unwrap_or(0).max(1)
    }
}

/// The resolved identity of one API v1 request.
///
/// Built by the authenticator from the key row joined with its tenant and
/// optional location, and shared with the handler through request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedApiKey {
    pub key: ApiKey,
    pub tenant: Tenant,
    pub location: Option<Location>,
    pub scopes: GrantedScopes,
}

impl AuthenticatedApiKey {
    pub fn new(key: ApiKey, tenant: Tenant, location: Option<Location>) -> Self {
        let scopes = GrantedScopes::from_strings(&key.scopes);
        Self {
            key,
            tenant,
            location,
            scopes,
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.key.tenant_id
    }

    /// Location the key is hard-scoped to, if any.
    pub fn location_id(&self) -> Option<Uuid> {
        self.key.location_id
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.has_scope(scope)
    }
}

pub type Principal = Arc<AuthenticatedApiKey>;

/// Row to insert when issuing a key. Holds the hash, never the plaintext.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub tenant_id: Uuid,
    pub location_id: Option<Uuid>,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub rate_limit_per_hour: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Issuance request, as a management surface would submit it.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Booking widget",
///   "location_id": "550e8400-e29b-41d4-a716-446655440000",
///   "scopes": ["read:services"],
///   "bundles": ["appointments"],
///   "rate_limit_per_hour": 500
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct IssueApiKeyRequest {
    pub name: String,

    #[serde(default)]
    pub location_id: Option<Uuid>,

    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub bundles: Vec<ScopeBundle>,

    #[serde(default)]
    pub rate_limit_per_hour: Option<u32>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response body for key endpoints. Never contains the hash.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub location_id: Option<Uuid>,
    pub scopes: Vec<String>,
    pub rate_limit_per_hour: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key_prefix: key.key_prefix,
            location_id: key.location_id,
            scopes: key.scopes,
            rate_limit_per_hour: key.rate_limit_per_hour,
            is_active: key.is_active,
            expires_at: key.expires_at,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
        }
    }
}

/// A freshly issued key. `key` is the only copy of the plaintext.
#[derive(Debug, Serialize)]
pub struct IssuedApiKey {
    #[serde(flatten)]
    pub api_key: ApiKeyResponse,
    pub key: String,
}
