//! Tenant-scoped location queries.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{pagination::Pagination, tenant::Location},
};

#[async_trait]
pub trait LocationStore: Send + Sync {
    /// One page of the tenant's locations plus the total count.
    ///
    /// `location_id` narrows the result to that single location.
    async fn list(
        &self,
        tenant_id: Uuid,
        location_id: Option<Uuid>,
        pagination: Pagination,
    ) -> Result<(Vec<Location>, u64), AppError>;

    async fn get(&self, tenant_id: Uuid, location_id: Uuid) -> Result<Option<Location>, AppError>;
}

#[derive(Clone)]
pub struct PgLocationStore {
    pool: DbPool,
}

impl PgLocationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationStore for PgLocationStore {
    async fn list(
        &self,
        tenant_id: Uuid,
        location_id: Option<Uuid>,
        pagination: Pagination,
    ) -> Result<(Vec<Location>, u64), AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM locations WHERE tenant_id = $1 AND ($2::uuid IS NULL OR id = $2)",
        )
        .bind(tenant_id)
        .bind(location_id)
        .fetch_one(&self.pool)
        .await?;

        let locations = sqlx::query_as::<_, Location>(
            r#"
            SELECT id, tenant_id, name, address, timezone, is_active, created_at
            FROM locations
            WHERE tenant_id = $1 AND ($2::uuid IS NULL OR id = $2)
            ORDER BY name ASC, id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id)
        .bind(location_id)
        .bind(i64::from(pagination.limit))
        .bind(i64::try_from(pagination.offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok((locations, total.max(0) as u64))
    }

    async fn get(&self, tenant_id: Uuid, location_id: Uuid) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            SELECT id, tenant_id, name, address, timezone, is_active, created_at
            FROM locations
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(location_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }
}
