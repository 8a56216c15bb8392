//! Database Connection Management
//!
//! Builds the PostgreSQL pool behind [`crate::store::PgStore`] and applies
//! the embedded migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::StoreConfig;

/// Database connection pool type alias for convenience
pub type DatabasePool = PgPool;

/// Pool settings resolved from [`StoreConfig`]
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    /// `None` when no database URL is configured
    pub fn from_store_config(config: &StoreConfig) -> Option<Self> {
        let url = config.database_url.clone()?;
        Some(Self {
            url,
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
            idle_timeout: Duration::from_secs(config.idle_timeout_seconds),
            max_lifetime: Duration::from_secs(config.max_lifetime_seconds),
        })
    }

    /// Create a database connection pool from this configuration
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .connect(&self.url)
            .await
    }
}

/// Apply the migrations under `migrations/`
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
