//! Database layer for Carbonserver
//!
//! Provides:
//! - SeaORM entity models
//! - The migration history
//! - Repository pattern for data access
//! - Connection pool management

pub mod migrations;
pub mod models;
mod repository;

pub use repository::{Member, Page, PageRequest, ProvisionedUser, Repository};

#[cfg(test)]
pub(crate) use repository::fixtures;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use migrations::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e),
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e),
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Wrap an already established connection (no replica)
    pub fn from_connection(primary: DatabaseConnection) -> Self {
        Self {
            primary,
            replica: None,
        }
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Apply every pending migration on the primary
    pub async fn migrate(&self) -> Result<()> {
        let pending = Migrator::get_pending_migrations(&self.primary).await?;
        if !pending.is_empty() {
            info!(count = pending.len(), "Applying database migrations");
        }
        Migrator::up(&self.primary, None).await?;
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);
    opts
}

/// Single-connection in-memory SQLite pool with the schema applied
#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = Database::connect(opts).await.unwrap();
    let pool = DbPool::from_connection(conn);
    pool.migrate().await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_apply_and_ping() {
        let pool = test_pool().await;
        pool.ping().await.unwrap();

        // Re-running is a no-op
        pool.migrate().await.unwrap();
        let pending = Migrator::get_pending_migrations(pool.write()).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_read_falls_back_to_primary() {
        let pool = test_pool().await;
        assert!(pool.replica.is_none());
        pool.read().execute_unprepared("SELECT 1").await.unwrap();
    }
}
