//! Carbonserver Common Library
//!
//! Shared code for the Carbonserver API including:
//! - Database models, migrations and the repository
//! - Project tokens, identity providers and access control
//! - Agent ingestion and time-window reports
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod aggregation;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingest;
pub mod metrics;
pub mod schemas;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
