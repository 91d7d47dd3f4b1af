use anyhow::Result;
use chrono::Utc;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tokio::time::interval;

use florabot::cli::{Cli, Commands};
use florabot::telegram::outbound::{setup_bot_commands, BotPool};
use florabot::telegram::webhook::{router, AppState};
use florabot::telegram::{BotRegistry, HandlerDeps, Processor, SqliteBotDirectory};
use floracore::session::store::SessionStore;
use floracore::session::{SessionLocks, SqliteSessionStore};
use floracore::storage::{create_pool, get_connection, shops};
use floracore::types::{BotKind, TenantId};
use floracore::{config, init_logger};

/// Main entry point for the bot platform.
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics from background tasks instead of dying silently; the
    // dispatcher additionally catches handler panics per turn.
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Run { bind }) => run_bot(bind).await,
        Some(Commands::SweepSessions {
            older_than_hours,
            dry_run,
        }) => run_sweep(older_than_hours, dry_run).await,
        None => {
            log::info!("No command specified, running the bot platform");
            run_bot(None).await
        }
    }
}

async fn run_bot(bind: Option<String>) -> Result<()> {
    if config::ADMIN_BOT_TOKEN.is_empty() {
        log::warn!("ADMIN_BOT_TOKEN is not set; only tenant bots will resolve");
    }

    let pool = Arc::new(create_pool(&config::DATABASE_PATH)?);
    log::info!("Database ready at {}", *config::DATABASE_PATH);

    let sessions: Arc<SqliteSessionStore> = Arc::new(SqliteSessionStore::new(Arc::clone(&pool)));
    let locks = Arc::new(SessionLocks::new());
    let deps = HandlerDeps::new(Arc::clone(&pool));

    let directory = Arc::new(SqliteBotDirectory::new(Arc::clone(&pool)));
    let registry = Arc::new(BotRegistry::new(directory));
    match registry.refresh().await {
        Ok(count) => log::info!("Bot registry bootstrapped with {} identities", count),
        Err(e) => log::error!("Bot registry bootstrap failed: {}", e),
    }

    let bots = Arc::new(BotPool::new()?);
    if !config::ADMIN_BOT_TOKEN.is_empty() {
        let admin_bot = bots.get(&config::ADMIN_BOT_TOKEN);
        if let Err(e) = setup_bot_commands(&admin_bot, BotKind::Admin).await {
            log::warn!("Failed to publish admin bot commands: {}", e);
        }
    }

    let processor = Arc::new(Processor::new(
        Arc::clone(&sessions) as Arc<dyn SessionStore>,
        Arc::clone(&locks),
        deps,
    ));

    // Stale-session sweep: the scheduled collaborator around the store's
    // find/delete contract.
    {
        let sessions = Arc::clone(&sessions);
        let locks = Arc::clone(&locks);
        tokio::spawn(async move {
            let mut tick = interval(config::session::sweep_interval());
            loop {
                tick.tick().await;
                let cutoff = Utc::now() - chrono::Duration::seconds(config::session::INACTIVITY_WINDOW_SECS as i64);
                match sessions.delete_stale_all(cutoff).await {
                    Ok(0) => {}
                    Ok(count) => log::info!("Swept {} stale sessions", count),
                    Err(e) => log::error!("Session sweep failed: {}", e),
                }
                locks.prune_idle();
            }
        });
    }

    // Directory re-sync: newly activated shops start resolving without a
    // restart; handlers never touch the registry themselves.
    {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let mut tick = interval(config::registry::refresh_interval());
            loop {
                tick.tick().await;
                if let Err(e) = registry.refresh().await {
                    log::error!("Bot registry refresh failed: {}", e);
                }
            }
        });
    }

    if let Some(base) = config::WEBHOOK_BASE_URL.as_deref() {
        log::info!("Expecting provider webhooks under {}/webhook/<token>", base);
    }

    let state = Arc::new(AppState {
        registry,
        processor,
        bots,
    });
    let app = router(state);

    let addr = bind.unwrap_or_else(|| config::BIND_ADDR.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Webhook server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            log::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn run_sweep(older_than_hours: Option<u64>, dry_run: bool) -> Result<()> {
    let pool = Arc::new(create_pool(&config::DATABASE_PATH)?);
    let sessions = SqliteSessionStore::new(Arc::clone(&pool));

    let window_secs = older_than_hours
        .map(|hours| hours * 3600)
        .unwrap_or(config::session::INACTIVITY_WINDOW_SECS);
    let cutoff = Utc::now() - chrono::Duration::seconds(window_secs as i64);

    if dry_run {
        // Page through every namespace: the admin bot plus each shop.
        let conn = get_connection(&pool)?;
        let mut namespaces = vec![None];
        for shop in shops::list_active_shops(&conn)? {
            namespaces.push(Some(TenantId(shop.id)));
        }
        drop(conn);

        let mut total = 0usize;
        for tenant in namespaces {
            let mut offset = 0usize;
            loop {
                let page = sessions
                    .find_stale(tenant, cutoff, config::session::STALE_PAGE_SIZE, offset)
                    .await?;
                if page.is_empty() {
                    break;
                }
                total += page.len();
                offset += config::session::STALE_PAGE_SIZE;
            }
        }
        log::info!("{} stale sessions would be purged (cutoff {})", total, cutoff);
    } else {
        let deleted = sessions.delete_stale_all(cutoff).await?;
        log::info!("Purged {} stale sessions (cutoff {})", deleted, cutoff);
    }

    Ok(())
}
