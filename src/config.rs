//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

use crate::models::pagination::PaginationOptions;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `REDIS_URL` (optional): rate limit counter store; rate limiting is disabled when unset
/// - `RATE_LIMIT_PREFIX` (optional): namespace for counter keys, defaults to `ratelimit:api-v1`
/// - `RATE_LIMIT_FAIL_CLOSED` (optional): reject requests when the counter store errors, defaults to false
/// - `DEFAULT_RATE_LIMIT_PER_HOUR` (optional): quota for newly issued keys, defaults to 1000
/// - `PAGINATION_DEFAULT_LIMIT` / `PAGINATION_MAX_LIMIT` (optional): 50 / 100
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_rate_limit_prefix")]
    pub rate_limit_prefix: String,

    #[serde(default)]
    pub rate_limit_fail_closed: bool,

    #[serde(default = "default_rate_limit_per_hour")]
    pub default_rate_limit_per_hour: u32,

    #[serde(default = "default_pagination_limit")]
    pub pagination_default_limit: u32,

    #[serde(default = "default_pagination_max_limit")]
    pub pagination_max_limit: u32,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_rate_limit_prefix() -> String {
    "ratelimit:api-v1".to_string()
}

fn default_rate_limit_per_hour() -> u32 {
    1000
}

fn default_pagination_limit() -> u32 {
    50
}

fn default_pagination_max_limit() -> u32 {
    100
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: redis_url -> REDIS_URL
        envy::from_env::<Config>()
    }

    /// Pagination bounds applied by the request guard.
    pub fn pagination(&self) -> PaginationOptions {
        PaginationOptions::new(self.pagination_default_limit, self.pagination_max_limit)
    }

    /// Redis URL, treating an empty value the same as an unset one.
    pub fn rate_limit_store_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
