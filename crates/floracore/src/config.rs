use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the platform.
///
/// Database file path.
/// Read from DATABASE_PATH environment variable.
/// Default: floragram.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "floragram.sqlite".to_string()));

/// Log file path.
/// Read from LOG_FILE_PATH environment variable.
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Admin bot token.
/// Read from ADMIN_BOT_TOKEN or TELOXIDE_TOKEN environment variable.
pub static ADMIN_BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("ADMIN_BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Admin bot username (without @), used for command-mention stripping.
/// Read from ADMIN_BOT_USERNAME environment variable.
pub static ADMIN_BOT_USERNAME: Lazy<Option<String>> = Lazy::new(|| env::var("ADMIN_BOT_USERNAME").ok());

/// Public base URL the messaging provider delivers webhooks to.
/// Read from WEBHOOK_BASE_URL environment variable.
pub static WEBHOOK_BASE_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_BASE_URL").ok());

/// Address the webhook server binds to.
/// Read from BIND_ADDR environment variable.
/// Default: 0.0.0.0:8080
pub static BIND_ADDR: Lazy<String> = Lazy::new(|| env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()));

/// Session lifecycle configuration
pub mod session {
    use super::Duration;

    /// Inactivity window after which a session is considered stale (in seconds)
    pub const INACTIVITY_WINDOW_SECS: u64 = 60 * 60 * 24; // 24 hours

    /// Interval between stale-session sweeps (in seconds)
    pub const SWEEP_INTERVAL_SECS: u64 = 60 * 15;

    /// Page size for stale-session scans on large tenants
    pub const STALE_PAGE_SIZE: usize = 200;

    /// Inactivity window duration
    pub fn inactivity_window() -> Duration {
        Duration::from_secs(INACTIVITY_WINDOW_SECS)
    }

    /// Sweep interval duration
    pub fn sweep_interval() -> Duration {
        Duration::from_secs(SWEEP_INTERVAL_SECS)
    }
}

/// Bot registry configuration
pub mod registry {
    use super::Duration;

    /// Interval between directory re-syncs (in seconds).
    /// Newly activated shops start resolving within this window.
    pub const REFRESH_INTERVAL_SECS: u64 = 30;

    /// Refresh interval duration
    pub fn refresh_interval() -> Duration {
        Duration::from_secs(REFRESH_INTERVAL_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for outbound Telegram API calls (in seconds)
    pub const TIMEOUT_SECS: u64 = 30;

    /// Budget for processing one inbound update before it is abandoned (in seconds)
    pub const PROCESS_TIMEOUT_SECS: u64 = 25;

    /// Outbound call timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }

    /// Per-update processing budget
    pub fn process_timeout() -> Duration {
        Duration::from_secs(PROCESS_TIMEOUT_SECS)
    }
}

/// Database pool configuration
pub mod database {
    /// Maximum number of pooled SQLite connections
    pub const MAX_POOL_SIZE: u32 = 10;
}
