//! Tenant (practice) and location records.
//!
//! Every API v1 row is owned by a tenant. A tenant may run several
//! locations (clinics); keys can be restricted to one of them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A veterinary practice account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,

    /// URL-safe unique handle (used by public landing pages)
    pub slug: String,

    pub created_at: DateTime<Utc>,
}

/// One physical clinic of a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Location {
    pub id: Uuid,

    /// Owning tenant; queries always filter on this
    pub tenant_id: Uuid,

    pub name: String,
    pub address: Option<String>,

    /// IANA zone name, e.g. `Europe/Lisbon`
    pub timezone: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
