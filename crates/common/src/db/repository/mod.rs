//! Repository pattern for database operations
//!
//! Every query the server issues lives here, grouped by entity. Methods are
//! named after the use case they serve. Multi-row writes run in a single
//! transaction on the primary; an early return drops the transaction, which
//! rolls it back.

mod aggregates;
mod emissions;
mod experiments;
mod organizations;
mod projects;
mod runs;
mod tokens;
mod users;

pub use organizations::Member;
pub use users::ProvisionedUser;

use crate::clock::{Clock, SystemClock};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Requested slice of a paginated listing (1-based)
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 100_000))]
    pub page: u64,

    #[serde(default = "default_size")]
    #[validate(range(min = 1, max = 500))]
    pub size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_size() -> u64 {
    50
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

/// One page of results plus the numbers needed to fetch the rest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
    pub pages: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` for the `created_at` of new rows
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

/// Turn an optional row into `NotFound` for the given entity name
pub(crate) fn found<T>(row: Option<T>, resource_type: &str, id: impl ToString) -> Result<T> {
    row.ok_or_else(|| AppError::not_found(resource_type, id))
}
