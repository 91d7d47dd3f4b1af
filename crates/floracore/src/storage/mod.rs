//! Database pool, schema, and domain data access

pub mod catalog;
pub mod db;
pub mod shops;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
