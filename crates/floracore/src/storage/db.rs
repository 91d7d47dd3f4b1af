use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result;

use crate::config;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool.
///
/// Initializes a connection pool and ensures the schema exists.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(config::database::MAX_POOL_SIZE).build(manager)?;

    // Ensure schema is up to date on first connection
    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
    }

    Ok(pool)
}

/// Get a connection from the pool.
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Migrate database schema to ensure all required tables exist.
///
/// Safe to run repeatedly; every statement is idempotent.
pub fn migrate_schema(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS owners (
             telegram_id INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             phone TEXT NOT NULL,
             email TEXT NOT NULL,
             city TEXT NOT NULL,
             created_at TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS shops (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             owner_id INTEGER NOT NULL REFERENCES owners(telegram_id),
             name TEXT NOT NULL,
             description TEXT,
             bot_token TEXT NOT NULL UNIQUE,
             bot_username TEXT,
             address TEXT,
             working_hours TEXT,
             active INTEGER NOT NULL DEFAULT 1,
             created_at TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS categories (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             shop_id INTEGER NOT NULL REFERENCES shops(id),
             name TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS products (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             shop_id INTEGER NOT NULL REFERENCES shops(id),
             category_id INTEGER REFERENCES categories(id),
             name TEXT NOT NULL,
             price_cents INTEGER NOT NULL,
             available INTEGER NOT NULL DEFAULT 1
         );

         CREATE TABLE IF NOT EXISTS orders (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             shop_id INTEGER NOT NULL REFERENCES shops(id),
             customer_id INTEGER NOT NULL,
             status TEXT NOT NULL,
             items TEXT NOT NULL,
             address TEXT,
             phone TEXT,
             created_at TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS sessions (
             tenant_id INTEGER NOT NULL,
             user_id INTEGER NOT NULL,
             state TEXT NOT NULL,
             flow_data TEXT NOT NULL,
             attributes TEXT NOT NULL,
             language TEXT NOT NULL,
             last_activity_at TEXT NOT NULL,
             PRIMARY KEY (tenant_id, user_id)
         );

         CREATE INDEX IF NOT EXISTS idx_sessions_activity
             ON sessions(tenant_id, last_activity_at);
         CREATE INDEX IF NOT EXISTS idx_shops_owner ON shops(owner_id);
         CREATE INDEX IF NOT EXISTS idx_products_shop ON products(shop_id);
         CREATE INDEX IF NOT EXISTS idx_orders_customer
             ON orders(shop_id, customer_id);",
    )?;

    Ok(())
}
