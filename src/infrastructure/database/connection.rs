use anyhow::{Context, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::str::FromStr;
use std::time::Duration;

use super::errors::DatabaseError;
use crate::domain::models::config::DatabaseConfig;

/// `MySQL` connection pool manager
///
/// Handles pool configuration, migrations and shutdown.
pub struct DatabaseConnection {
    pool: MySqlPool,
}

impl DatabaseConnection {
    /// Connect eagerly, failing if the server is unreachable.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = connect_options(&config.url)?;
        let pool = pool_options(config)
            .connect_with(options)
            .await
            .context("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Build the pool without opening a connection until first use.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let options = connect_options(&config.url)?;
        Ok(Self {
            pool: pool_options(config).connect_lazy_with(options),
        })
    }

    /// Apply pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(DatabaseError::from)
            .context("failed to run migrations")?;
        Ok(())
    }

    /// Underlying connection pool.
    pub const fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Close all connections; call during shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn connect_options(url: &str) -> Result<MySqlConnectOptions> {
    MySqlConnectOptions::from_str(url)
        .map_err(|e| DatabaseError::InvalidUrl(e.to_string()))
        .context("invalid database URL")
}

fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
}
