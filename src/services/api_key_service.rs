//! Issuing and revoking API keys.
//!
//! This is the logic a management surface calls; the request path only reads
//! what these functions write.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::Config,
    db::ApiKeyStore,
    error::AppError,
    models::{
        api_key::{ApiKeyResponse, IssueApiKeyRequest, IssuedApiKey, NewApiKey},
        scope::{Scope, validate_scopes},
    },
    services::key_codec,
};

/// Key issuance and lifecycle over an [`ApiKeyStore`].
#[derive(Clone)]
pub struct ApiKeyService {
    store: Arc<dyn ApiKeyStore>,

    /// Quota for keys issued without an explicit `rate_limit_per_hour`
    default_rate_limit_per_hour: u32,
}

impl ApiKeyService {
    pub fn new(store: Arc<dyn ApiKeyStore>, default_rate_limit_per_hour: u32) -> Self {
        Self {
            store,
            default_rate_limit_per_hour,
        }
    }

    pub fn from_config(store: Arc<dyn ApiKeyStore>, config: &Config) -> Self {
        Self::new(store, config.default_rate_limit_per_hour)
    }

    /// Issue a new key for `tenant_id`.
    ///
    /// # Process
    ///
    /// 1. Validate name, scopes, limit, expiry and location ownership
    /// 2. Expand bundles into concrete scopes
    /// 3. Generate the key and store only its hash and display prefix
    /// 4. Return the plaintext (the only time it is available)
    ///
    /// # Errors
    ///
    /// - `BadRequest`: any validation failure, naming the offending input
    /// - `Database`: storage failed
    pub async fn issue_api_key(
        &self,
        tenant_id: Uuid,
        request: IssueApiKeyRequest,
    ) -> Result<IssuedApiKey, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("API key name is required"));
        }

        let validation = validate_scopes(&request.scopes);
        if !validation.is_valid() {
            return Err(AppError::bad_request(format!(
                "Invalid scopes: {}",
                validation.invalid.join(", ")
            )));
        }

        let mut scopes: Vec<Scope> = validation.valid;
        for bundle in &request.bundles {
            for scope in bundle.scopes() {
                if !scopes.contains(&scope) {
                    scopes.push(scope);
                }
            }
        }
        if scopes.is_empty() {
            return Err(AppError::bad_request("At least one scope is required"));
        }
        scopes.sort();

        let rate_limit_per_hour = request
            .rate_limit_per_hour
            .unwrap_or(self.default_rate_limit_per_hour);
        let rate_limit_per_hour = i32::try_from(rate_limit_per_hour)
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or_else(|| AppError::bad_request("rate_limit_per_hour must be a positive integer"))?;

        if request.expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(AppError::bad_request("expires_at must be in the future"));
        }

        if let Some(location_id) = request.location_id {
            if !self.store.location_belongs_to_tenant(tenant_id, location_id).await? {
                return Err(AppError::bad_request("Location does not belong to this tenant"));
            }
        }

        let generated = key_codec::generate();
        let api_key = self
            .store
            .insert(NewApiKey {
                tenant_id,
                location_id: request.location_id,
                name: name.to_string(),
                key_hash: generated.hash,
                key_prefix: generated.display_prefix,
                scopes: scopes.iter().map(|scope| scope.as_str().to_string()).collect(),
                rate_limit_per_hour,
                expires_at: request.expires_at,
            })
            .await?;

        tracing::info!(
            api_key_id = %api_key.id,
            %tenant_id,
            location_id = ?api_key.location_id,
            "API key issued"
        );

        Ok(IssuedApiKey {
            api_key: ApiKeyResponse::from(api_key),
            key: generated.full_key,
        })
    }

    /// Enable or disable a key. Takes effect on the next request.
    pub async fn set_api_key_active(
        &self,
        tenant_id: Uuid,
        key_id: Uuid,
        is_active: bool,
    ) -> Result<(), AppError> {
        if !self.store.set_active(tenant_id, key_id, is_active).await? {
            return Err(AppError::not_found("API key not found"));
        }

        tracing::info!(api_key_id = %key_id, %tenant_id, is_active, "API key activity changed");
        Ok(())
    }

    /// Soft-delete a key. History referencing it stays intact.
    pub async fn revoke_api_key(&self, tenant_id: Uuid, key_id: Uuid) -> Result<(), AppError> {
        if !self.store.soft_delete(tenant_id, key_id).await? {
            return Err(AppError::not_found("API key not found"));
        }

        tracing::info!(api_key_id = %key_id, %tenant_id, "API key revoked");
        Ok(())
    }
}
