//! Per-key sliding window rate limiting.
//!
//! Each API key gets its own window of one hour whose capacity is the key's
//! `rate_limit_per_hour`. Counters live in a shared store (Redis in
//! production) under `{prefix}:{api_key_id}`, so every process sees the same
//! counts and nothing leaks between keys or other users of the store.
//!
//! When no store is configured the limiter is disabled and every check
//! passes. That favours availability over strict quota enforcement.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use redis::{Script, aio::ConnectionManager};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{config::Config, error::AppError};

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

pub const WINDOW: Duration = Duration::from_secs(60 * 60);

/// Counter store failure (connection refused, script error, ...).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CounterStoreError(pub String);

/// State of one window right after a hit was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Whether the hit was recorded
    pub allowed: bool,

    /// Requests inside the window, including this one when allowed
    pub count: u32,

    /// Timestamp of the oldest request still inside the window
    pub oldest_ms: i64,
}

/// Atomic sliding-window counter keyed by string.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Drop entries older than `window_ms`, then record `now_ms` if fewer
    /// than `limit` entries remain. Must be atomic per key.
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
    ) -> Result<WindowState, CounterStoreError>;
}

/// Outcome of one rate limit check, surfaced as response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

/// Rate limiter owned by the composition root and injected into the authenticator.
#[derive(Clone)]
pub struct RateLimiter {
    store: Option<Arc<dyn CounterStore>>,
    prefix: Arc<str>,
    fail_closed: bool,
}

impl RateLimiter {
    /// A limiter that lets everything through and reports nothing.
    pub fn disabled() -> Self {
        Self {
            store: None,
            prefix: Arc::from(""),
            fail_closed: false,
        }
    }

    pub fn with_store(store: Arc<dyn CounterStore>, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            store: Some(store),
            prefix: Arc::from(prefix),
            fail_closed: false,
        }
    }

    /// Turn counter store errors into request failures instead of letting requests through.
    pub fn fail_closed(mut self, fail_closed: bool) -> Self {
        self.fail_closed = fail_closed;
        self
    }

    /// Build the limiter from configuration.
    ///
    /// No `REDIS_URL` means rate limiting is disabled. A Redis that cannot be
    /// reached at startup is treated the same way.
    pub async fn from_config(config: &Config) -> Self {
        let Some(url) = config.rate_limit_store_url() else {
            tracing::warn!("REDIS_URL not set, API rate limiting is disabled");
            return Self::disabled();
        };

        match RedisCounterStore::connect(url).await {
            Ok(store) => {
                tracing::info!(prefix = %config.rate_limit_prefix, "Rate limiting enabled");
                Self::with_store(Arc::new(store), config.rate_limit_prefix.clone())
                    .fail_closed(config.rate_limit_fail_closed)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Rate limit store unreachable, API rate limiting is disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn counter_key(&self, api_key_id: Uuid) -> String {
        format!("{}:{}", self.prefix, api_key_id)
    }

    /// Count one request for `api_key_id` against `limit` requests per hour.
    ///
    /// Returns `Ok(None)` when limiting is disabled or the store failed in
    /// fail-open mode.
    pub async fn check(
        &self,
        api_key_id: Uuid,
        limit: u32,
    ) -> Result<Option<RateLimitDecision>, AppError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let limit = limit.max(1);
        let now_ms = Utc::now().timestamp_millis();
        let window_ms = WINDOW.as_millis() as i64;

        match store
            .hit(&self.counter_key(api_key_id), now_ms, window_ms, limit)
            .await
        {
            Ok(state) => Ok(Some(RateLimitDecision {
                allowed: state.allowed,
                limit,
                remaining: limit.saturating_sub(state.count),
                reset_at_ms: state.oldest_ms + window_ms,
            })),
            Err(err) if self.fail_closed => Err(AppError::RateLimitStore(err.to_string())),
            Err(err) => {
                tracing::warn!(%api_key_id, error = %err, "Rate limit check failed, allowing request");
                Ok(None)
            }
        }
    }
}

const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local member = ARGV[4]

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
local count = redis.call('ZCARD', key)
local allowed = 0
if count < limit then
  redis.call('ZADD', key, now, member)
  count = count + 1
  allowed = 1
end
redis.call('PEXPIRE', key, window)

local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
local oldest_ms = now
if oldest[2] then
  oldest_ms = tonumber(oldest[2])
end
return {allowed, count, oldest_ms}
"#;

/// Sorted-set sliding window in Redis. One Lua script per hit keeps it atomic.
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
    script: Arc<Script>,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(url)
            .map_err(|err| CounterStoreError(format!("redis client: {err}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| CounterStoreError(format!("redis connect: {err}")))?;
        Ok(Self {
            manager,
            script: Arc::new(Script::new(SLIDING_WINDOW_SCRIPT)),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
    ) -> Result<WindowState, CounterStoreError> {
        let mut conn = self.manager.clone();
        let member = format!("{now_ms}-{}", Uuid::new_v4().simple());

        let (allowed, count, oldest_ms): (i64, i64, i64) = self
            .script
            .key(key)
            .arg(now_ms)
            .arg(window_ms)
            .arg(limit)
            .arg(member)
            .invoke_async(&mut conn)
            .await
            .map_err(|err| CounterStoreError(format!("redis sliding window: {err}")))?;

        Ok(WindowState {
            allowed: allowed == 1,
            count: u32::try_from(count).unwrap_or(u32::MAX),
            oldest_ms,
        })
    }
}

/// In-process sliding window, for single-instance deployments and tests.
#[derive(Default)]
pub struct MemoryCounterStore {
    windows: Mutex<HashMap<String, VecDeque<i64>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        limit: u32,
    ) -> Result<WindowState, CounterStoreError> {
        let mut windows = self.windows.lock().await;
        let hits = windows.entry(key.to_string()).or_default();

        while hits.front().is_some_and(|&at| at <= now_ms - window_ms) {
            hits.pop_front();
        }

        let allowed = hits.len() < limit as usize;
        if allowed {
            hits.push_back(now_ms);
        }

        Ok(WindowState {
            allowed,
            count: hits.len() as u32,
            oldest_ms: hits.front().copied().unwrap_or(now_ms),
        })
    }
}
