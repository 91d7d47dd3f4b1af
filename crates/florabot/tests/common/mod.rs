//! Shared helpers for florabot integration tests.
#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use florabot::telegram::{admin_handler_set, tenant_handler_set, Dispatcher, HandlerDeps, Processor};
use floracore::session::store::SessionStore;
use floracore::session::{Session, SessionKey, SessionLocks, SqliteSessionStore};
use floracore::storage::{catalog, create_pool, shops, DbPool};
use floracore::types::{BotIdentity, BotKind, TenantId};

pub const ADMIN_TOKEN: &str = "10000:AdminSecretToken";

/// One test's isolated platform: temp database, stores, and a processor.
pub struct TestEnv {
    _db_file: tempfile::NamedTempFile,
    pub pool: Arc<DbPool>,
    pub sessions: Arc<SqliteSessionStore>,
    pub locks: Arc<SessionLocks>,
    pub deps: HandlerDeps,
    pub processor: Processor,
}

impl TestEnv {
    /// Environment with the production handler sets.
    pub fn new() -> Self {
        Self::with_dispatchers(
            Dispatcher::new(admin_handler_set()),
            Dispatcher::new(tenant_handler_set()),
        )
    }

    /// Environment with injected dispatchers (for error-policy tests).
    pub fn with_dispatchers(admin: Dispatcher, tenant: Dispatcher) -> Self {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let pool = Arc::new(create_pool(db_file.path().to_str().unwrap()).unwrap());
        let sessions = Arc::new(SqliteSessionStore::new(Arc::clone(&pool)));
        let locks = Arc::new(SessionLocks::new());
        let deps = HandlerDeps::new(Arc::clone(&pool));
        let processor = Processor::with_dispatchers(
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::clone(&locks),
            deps.clone(),
            admin,
            tenant,
        );

        Self {
            _db_file: db_file,
            pool,
            sessions,
            locks,
            deps,
            processor,
        }
    }

    /// Loads the persisted session for assertions.
    pub async fn session(&self, key: &SessionKey) -> Session {
        self.sessions.get_or_create(key).await.unwrap()
    }

    pub fn seed_owner(&self, user_id: i64) {
        let conn = self.pool.get().unwrap();
        shops::create_owner(
            &conn,
            &shops::Owner {
                telegram_id: user_id,
                name: "Anna".into(),
                phone: "+79990001122".into(),
                email: "anna@example.com".into(),
                city: "Moscow".into(),
            },
        )
        .unwrap();
    }

    pub fn seed_shop(&self, owner_id: i64, name: &str, token: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        shops::create_shop(&conn, owner_id, name, None, token, None, None).unwrap()
    }

    pub fn seed_product(&self, shop_id: i64, name: &str, price_cents: i64) -> i64 {
        let conn = self.pool.get().unwrap();
        catalog::create_product(&conn, shop_id, None, name, price_cents).unwrap()
    }

    /// Marks a session as a registered owner (what the registration flow
    /// leaves behind), so gated admin commands pass the auth predicate.
    pub async fn authenticate_owner(&self, user_id: i64) {
        let key = SessionKey::admin(user_id);
        let mut session = self.sessions.get_or_create(&key).await.unwrap();
        session
            .attributes
            .insert("owner_registered".to_string(), "true".to_string());
        self.sessions.save(&session).await.unwrap();
        self.seed_owner(user_id);
    }
}

pub fn admin_identity() -> BotIdentity {
    BotIdentity::admin(ADMIN_TOKEN, Some("floragram_bot".into()))
}

pub fn tenant_identity(shop_id: i64, token: &str) -> BotIdentity {
    BotIdentity {
        tenant_id: Some(TenantId(shop_id)),
        token: token.to_string(),
        username: None,
        kind: BotKind::Tenant,
        active: true,
    }
}
