//! Persistence for API keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        api_key::{ApiKey, AuthenticatedApiKey, NewApiKey},
        tenant::{Location, Tenant},
    },
};

/// Storage operations the authenticator and key issuance need.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Look up a non-deleted key by hash, joined with its tenant and location.
    ///
    /// Inactive and expired keys are returned too; the caller decides.
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<AuthenticatedApiKey>, AppError>;

    async fn touch_last_used(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    async fn insert(&self, key: NewApiKey) -> Result<ApiKey, AppError>;

    /// Returns `false` when no live key with this id exists in the tenant.
    async fn set_active(&self, tenant_id: Uuid, key_id: Uuid, is_active: bool)
    -> Result<bool, AppError>;

    /// Soft delete. Returns `false` when no live key with this id exists in the tenant.
    async fn soft_delete(&self, tenant_id: Uuid, key_id: Uuid) -> Result<bool, AppError>;

    async fn location_belongs_to_tenant(
        &self,
        tenant_id: Uuid,
        location_id: Uuid,
    ) -> Result<bool, AppError>;

    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Flat row produced by the key/tenant/location join.
#[derive(Debug, sqlx::FromRow)]
struct ApiKeyWithRelationsRow {
    id: Uuid,
    tenant_id: Uuid,
    location_id: Option<Uuid>,
    name: String,
    key_hash: String,
    key_prefix: String,
    scopes: Vec<String>,
    rate_limit_per_hour: i32,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,

    tenant_name: String,
    tenant_slug: String,
    tenant_created_at: DateTime<Utc>,

    location_name: Option<String>,
    location_address: Option<String>,
    location_timezone: Option<String>,
    location_is_active: Option<bool>,
    location_created_at: Option<DateTime<Utc>>,
}

impl From<ApiKeyWithRelationsRow> for AuthenticatedApiKey {
    fn from(row: ApiKeyWithRelationsRow) -> Self {
        let tenant = Tenant {
            id: row.tenant_id,
            name: row.tenant_name,
            slug: row.tenant_slug,
            created_at: row.tenant_created_at,
        };

        // LEFT JOIN: location columns are all NULL for tenant-wide keys
        let location = match (row.location_id, row.location_name, row.location_created_at) {
            (Some(id), Some(name), Some(created_at)) => Some(Location {
                id,
                tenant_id: row.tenant_id,
                name,
                address: row.location_address,
                timezone: row.location_timezone.unwrap_or_else(|| "UTC".to_string()),
                is_active: row.location_is_active.unwrap_or(true),
                created_at,
            }),
            _ => None,
        };

        let key = ApiKey {
            id: row.id,
            tenant_id: row.tenant_id,
            location_id: row.location_id,
            name: row.name,
            key_hash: row.key_hash,
            key_prefix: row.key_prefix,
            scopes: row.scopes,
            rate_limit_per_hour: row.rate_limit_per_hour,
            is_active: row.is_active,
            expires_at: row.expires_at,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        };

        AuthenticatedApiKey::new(key, tenant, location)
    }
}

const API_KEY_COLUMNS: &str = "id, tenant_id, location_id, name, key_hash, key_prefix, scopes, \
     rate_limit_per_hour, is_active, expires_at, last_used_at, created_at";

/// PostgreSQL-backed [`ApiKeyStore`].
#[derive(Clone)]
pub struct PgApiKeyStore {
    pool: DbPool,
}

impl PgApiKeyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyStore for PgApiKeyStore {
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<AuthenticatedApiKey>, AppError> {
        let row = sqlx::query_as::<_, ApiKeyWithRelationsRow>(
            r#"
            SELECT k.id, k.tenant_id, k.location_id, k.name, k.key_hash, k.key_prefix, k.scopes,
                   k.rate_limit_per_hour, k.is_active, k.expires_at, k.last_used_at, k.created_at,
                   t.name AS tenant_name, t.slug AS tenant_slug, t.created_at AS tenant_created_at,
                   l.name AS location_name, l.address AS location_address,
                   l.timezone AS location_timezone, l.is_active AS location_is_active,
                   l.created_at AS location_created_at
            FROM api_keys k
            JOIN tenants t ON t.id = k.tenant_id
            LEFT JOIN locations l ON l.id = k.location_id
            WHERE k.key_hash = $1 AND k.deleted_at IS NULL
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn touch_last_used(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE api_keys SET last_used_at = $1 WHERE id = $2")
            .bind(at)
            .bind(key_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert(&self, key: NewApiKey) -> Result<ApiKey, AppError> {
        let query = format!(
            r#"
            INSERT INTO api_keys (tenant_id, location_id, name, key_hash, key_prefix, scopes,
                                  rate_limit_per_hour, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {API_KEY_COLUMNS}
            "#
        );

        let api_key = sqlx::query_as::<_, ApiKey>(&query)
            .bind(key.tenant_id)
            .bind(key.location_id)
            .bind(key.name)
            .bind(key.key_hash)
            .bind(key.key_prefix)
            .bind(key.scopes)
            .bind(key.rate_limit_per_hour)
            .bind(key.expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(api_key)
    }

    async fn set_active(
        &self,
        tenant_id: Uuid,
        key_id: Uuid,
        is_active: bool,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE api_keys SET is_active = $1 \
             WHERE id = $2 AND tenant_id = $3 AND deleted_at IS NULL",
        )
        .bind(is_active)
        .bind(key_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, tenant_id: Uuid, key_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE api_keys SET deleted_at = NOW(), is_active = false \
             WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(key_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn location_belongs_to_tenant(
        &self,
        tenant_id: Uuid,
        location_id: Uuid,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1 AND tenant_id = $2)",
        )
        .bind(location_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
