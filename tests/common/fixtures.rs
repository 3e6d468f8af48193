//! Test fixtures: tenants, locations and keys with known plaintext.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use practice_api_gateway::{
    models::{
        api_key::ApiKey,
        tenant::{Location, Tenant},
    },
    services::key_codec,
};

pub fn tenant(name: &str) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        created_at: Utc::now(),
    }
}

pub fn location(tenant: &Tenant, name: &str) -> Location {
    Location {
        id: Uuid::new_v4(),
        tenant_id: tenant.id,
        name: name.to_string(),
        address: Some("1 Main Street".to_string()),
        timezone: "Europe/Lisbon".to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}

/// Builder for API keys whose plaintext the test keeps.
pub struct KeyFixture {
    pub plaintext: String,
    pub key: ApiKey,
}

impl KeyFixture {
    pub fn new(tenant: &Tenant, scopes: &[&str]) -> Self {
        let generated = key_codec::generate();
        Self {
            plaintext: generated.full_key,
            key: ApiKey {
                id: Uuid::new_v4(),
                tenant_id: tenant.id,
                location_id: None,
                name: "integration".to_string(),
                key_hash: generated.hash,
                key_prefix: generated.display_prefix,
                scopes: scopes.iter().map(|s| s.to_string()).collect(),
                rate_limit_per_hour: 1000,
                is_active: true,
                expires_at: None,
                last_used_at: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn at_location(mut self, location: &Location) -> Self {
        self.key.location_id = Some(location.id);
        self
    }

    pub fn rate_limit(mut self, per_hour: i32) -> Self {
        self.key.rate_limit_per_hour = per_hour;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.key.is_active = false;
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.key.expires_at = Some(at);
        self
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.plaintext)
    }
}
