//! Database Module
//!
//! PostgreSQL connection management for the account service.

pub mod connection;

// Re-export commonly used types
pub use connection::{run_migrations, DatabaseConfig, DatabasePool};
