//! In-memory stores standing in for PostgreSQL.

use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use practice_api_gateway::{
    db::{ApiKeyStore, LocationStore},
    error::AppError,
    models::{
        api_key::{ApiKey, AuthenticatedApiKey, NewApiKey},
        pagination::Pagination,
        tenant::{Location, Tenant},
    },
};

struct StoredKey {
    key: ApiKey,
    deleted: bool,
}

/// In-memory tenants, locations and API keys.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tenants: Arc<RwLock<HashMap<Uuid, Tenant>>>,
    locations: Arc<RwLock<HashMap<Uuid, Location>>>,
    keys: Arc<RwLock<HashMap<Uuid, StoredKey>>>,
    lookups: Arc<AtomicUsize>,
    fail_lookups: Arc<AtomicBool>,
    fail_touch: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant(&self, tenant: Tenant) {
        self.tenants.write().unwrap().insert(tenant.id, tenant);
    }

    pub fn add_location(&self, location: Location) {
        self.locations.write().unwrap().insert(location.id, location);
    }

    pub fn add_key(&self, key: ApiKey) {
        self.keys.write().unwrap().insert(
            key.id,
            StoredKey {
                key,
                deleted: false,
            },
        );
    }

    pub fn key(&self, id: Uuid) -> Option<ApiKey> {
        self.keys
            .read()
            .unwrap()
            .get(&id)
            .map(|stored| stored.key.clone())
    }

    pub fn is_deleted(&self, id: Uuid) -> bool {
        self.keys
            .read()
            .unwrap()
            .get(&id)
            .is_some_and(|stored| stored.deleted)
    }

    /// Number of `find_by_hash` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Make `find_by_hash` fail like an unreachable database.
    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    /// Make `touch_last_used` fail.
    pub fn fail_touch(&self) {
        self.fail_touch.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<AuthenticatedApiKey>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(AppError::internal("connection refused"));
        }

        let keys = self.keys.read().unwrap();
        let Some(key) = keys
            .values()
            .filter(|stored| !stored.deleted)
            .map(|stored| &stored.key)
            .find(|key| key.key_hash == key_hash)
            .cloned()
        else {
            return Ok(None);
        };

        let tenant = self
            .tenants
            .read()
            .unwrap()
            .get(&key.tenant_id)
            .cloned()
            .ok_or_else(|| AppError::internal("dangling tenant"))?;
        let location = key
            .location_id
            .and_then(|id| self.locations.read().unwrap().get(&id).cloned());

        Ok(Some(AuthenticatedApiKey::new(key, tenant, location)))
    }

    async fn touch_last_used(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(AppError::internal("write timeout"));
        }
        if let Some(stored) = self.keys.write().unwrap().get_mut(&key_id) {
            stored.key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn insert(&self, new_key: NewApiKey) -> Result<ApiKey, AppError> {
        let key = ApiKey {
            id: Uuid::new_v4(),
            tenant_id: new_key.tenant_id,
            location_id: new_key.location_id,
            name: new_key.name,
            key_hash: new_key.key_hash,
            key_prefix: new_key.key_prefix,
            scopes: new_key.scopes,
            rate_limit_per_hour: new_key.rate_limit_per_hour,
            is_active: true,
            expires_at: new_key.expires_at,
            last_used_at: None,
            created_at: Utc::now(),
        };
        self.add_key(key.clone());
        Ok(key)
    }

    async fn set_active(
        &self,
        tenant_id: Uuid,
        key_id: Uuid,
        is_active: bool,
    ) -> Result<bool, AppError> {
        let mut keys = self.keys.write().unwrap();
        match keys.get_mut(&key_id) {
            Some(stored) if !stored.deleted && stored.key.tenant_id == tenant_id => {
                stored.key.is_active = is_active;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete(&self, tenant_id: Uuid, key_id: Uuid) -> Result<bool, AppError> {
        let mut keys = self.keys.write().unwrap();
        match keys.get_mut(&key_id) {
            Some(stored) if !stored.deleted && stored.key.tenant_id == tenant_id => {
                stored.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn location_belongs_to_tenant(
        &self,
        tenant_id: Uuid,
        location_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .locations
            .read()
            .unwrap()
            .get(&location_id)
            .is_some_and(|location| location.tenant_id == tenant_id))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn list(
        &self,
        tenant_id: Uuid,
        location_id: Option<Uuid>,
        pagination: Pagination,
    ) -> Result<(Vec<Location>, u64), AppError> {
        let mut matching: Vec<Location> = self
            .locations
            .read()
            .unwrap()
            .values()
            .filter(|location| location.tenant_id == tenant_id)
            .filter(|location| location_id.is_none_or(|id| location.id == id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn get(&self, tenant_id: Uuid, location_id: Uuid) -> Result<Option<Location>, AppError> {
        Ok(self
            .locations
            .read()
            .unwrap()
            .get(&location_id)
            .filter(|location| location.tenant_id == tenant_id)
            .cloned())
    }
}
