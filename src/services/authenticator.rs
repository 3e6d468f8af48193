//! Resolves an `Authorization` header to an authenticated API key.
//!
//! # Flow
//!
//! 1. Extract the token (`Bearer <key>` or bare `<key>`) and check its format
//! 2. Hash it and look up the key with its tenant and location
//! 3. Reject disabled and expired keys
//! 4. Count the request against the key's hourly quota
//! 5. Record `last_used_at` in the background
//!
//! Every step is terminal on failure. Nothing is retried.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    db::ApiKeyStore,
    error::AppError,
    models::api_key::{AuthenticatedApiKey, Principal},
    services::{
        key_codec,
        rate_limiter::{RateLimitDecision, RateLimiter},
    },
};

const MISSING_KEY: &str = "API key required";
const INVALID_KEY: &str = "Invalid API key";
const DISABLED_KEY: &str = "API key is disabled";
const EXPIRED_KEY: &str = "API key has expired";

/// Successful authentication of one request.
#[derive(Debug, Clone)]
pub struct Authentication {
    pub principal: Principal,

    /// `None` when rate limiting is disabled
    pub rate_limit: Option<RateLimitDecision>,
}

#[derive(Clone)]
pub struct Authenticator {
    api_keys: Arc<dyn ApiKeyStore>,
    rate_limiter: RateLimiter,
}

impl Authenticator {
    pub fn new(api_keys: Arc<dyn ApiKeyStore>, rate_limiter: RateLimiter) -> Self {
        Self {
            api_keys,
            rate_limiter,
        }
    }

    /// Authenticate the raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Authentication, AppError> {
        let token = authorization
            .and_then(key_codec::extract_bearer_token)
            .ok_or_else(|| AppError::unauthorized(MISSING_KEY))?;

        // Malformed keys get the same answer as unknown ones and never hit the store.
        if !key_codec::is_valid_format(token) {
            tracing::debug!("Rejected API key with invalid format");
            return Err(AppError::unauthorized(INVALID_KEY));
        }

        let key_hash = key_codec::hash(token);
        let principal = self
            .api_keys
            .find_by_hash(&key_hash)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_KEY))?;

        self.check_liveness(&principal)?;

        let limit = principal.key.hourly_limit();
        let rate_limit = self.rate_limiter.check(principal.key.id, limit).await?;
        if let Some(decision) = rate_limit.filter(|decision| !decision.allowed) {
            tracing::info!(
                api_key_id = %principal.key.id,
                tenant_id = %principal.tenant_id(),
                limit,
                "API key rate limit exceeded"
            );
            return Err(AppError::RateLimited {
                limit,
                reset_at_ms: decision.reset_at_ms,
            });
        }

        self.record_usage(&principal);

        Ok(Authentication {
            principal: Arc::new(principal),
            rate_limit,
        })
    }

    fn check_liveness(&self, principal: &AuthenticatedApiKey) -> Result<(), AppError> {
        if !principal.key.is_active {
            tracing::debug!(api_key_id = %principal.key.id, "Rejected disabled API key");
            return Err(AppError::unauthorized(DISABLED_KEY));
        }

        if principal.key.is_expired_at(Utc::now()) {
            tracing::debug!(api_key_id = %principal.key.id, "Rejected expired API key");
            return Err(AppError::unauthorized(EXPIRED_KEY));
        }

        if !principal.scopes.unknown().is_empty() {
            tracing::debug!(
                api_key_id = %principal.key.id,
                unknown = ?principal.scopes.unknown(),
                "API key carries scopes unknown to this build"
            );
        }

        Ok(())
    }

    /// Fire-and-forget `last_used_at` update. Failures are logged, never returned.
    fn record_usage(&self, principal: &AuthenticatedApiKey) {
        let api_keys = Arc::clone(&self.api_keys);
        let key_id = principal.key.id;

        tokio::spawn(async move {
            if let Err(err) = api_keys.touch_last_used(key_id, Utc::now()).await {
                tracing::warn!(api_key_id = %key_id, error = %err, "Failed to update API key last_used_at");
            }
        });
    }
}
