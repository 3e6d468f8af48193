//! Database connection pool, migrations and the repositories built on them.
//!
//! Repositories are exposed as traits ([`ApiKeyStore`], [`LocationStore`]) so
//! the request path does not depend on PostgreSQL directly.

use sqlx::{Pool, Postgres};

pub mod api_key_repository;
pub mod location_repository;

pub use api_key_repository::{ApiKeyStore, PgApiKeyStore};
pub use location_repository::{LocationStore, PgLocationStore};

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// A connection pool maintains multiple database connections that can be reused across HTTP requests which is much more efficient than opening a new connection for each request.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - Cannot connect to PostgreSQL server
/// - Database authentication fails
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        // Every API v1 request does one key lookup plus the handler query
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so each one runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}
