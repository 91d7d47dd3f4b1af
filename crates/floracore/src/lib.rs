//! Floracore - core library for the Floragram flower-shop bot platform
//!
//! This library provides everything below the Telegram surface: tenant
//! context, conversation sessions and their store, SQLite storage, i18n,
//! configuration, and the shared error taxonomy. It has no Telegram
//! dependency unless the `telegram` feature is enabled (which only adds an
//! error conversion).
//!
//! # Module Structure
//!
//! - `config`: environment-driven configuration
//! - `context`: task-scoped tenant context
//! - `session`: conversation state machine, session store, per-key locks
//! - `storage`: database pool, schema, and domain data access
//! - `i18n`: message catalogs

pub mod config;
pub mod context;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod session;
pub mod storage;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use session::{Session, SessionKey, SessionLocks, SessionState, SessionStore, SqliteSessionStore};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use types::{BotIdentity, BotKind, TenantId};
