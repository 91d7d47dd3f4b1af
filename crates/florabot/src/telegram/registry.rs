//! Bot registry: resolves inbound routing keys to bot identities.
//!
//! The routing key is the bot token carried in the webhook path. The registry
//! is a cache over the tenant directory: resolution misses fall through to
//! the directory once, hits stay in memory, and a periodic re-sync picks up
//! shops activated after startup. Resolution failure is a typed miss
//! (`None`), never an error into the dispatch loop.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use floracore::config;
use floracore::error::AppResult;
use floracore::storage::{get_connection, shops, DbPool};
use floracore::types::{BotIdentity, BotKind, TenantId};

/// Directory of bot identities, owned by the tenant-management side.
#[async_trait]
pub trait BotDirectory: Send + Sync {
    async fn lookup_by_routing_key(&self, key: &str) -> AppResult<Option<BotIdentity>>;
    async fn list_active(&self) -> AppResult<Vec<BotIdentity>>;
}

/// Directory over the `shops` table plus the configured admin token.
pub struct SqliteBotDirectory {
    pool: Arc<DbPool>,
    admin_token: String,
    admin_username: Option<String>,
}

impl SqliteBotDirectory {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self {
            pool,
            admin_token: config::ADMIN_BOT_TOKEN.clone(),
            admin_username: config::ADMIN_BOT_USERNAME.clone(),
        }
    }

    pub fn with_admin_token(pool: Arc<DbPool>, admin_token: impl Into<String>) -> Self {
        Self {
            pool,
            admin_token: admin_token.into(),
            admin_username: None,
        }
    }

    fn shop_identity(shop: &shops::Shop) -> BotIdentity {
        BotIdentity {
            tenant_id: Some(TenantId(shop.id)),
            token: shop.bot_token.clone(),
            username: shop.bot_username.clone(),
            kind: BotKind::Tenant,
            active: shop.active,
        }
    }
}

#[async_trait]
impl BotDirectory for SqliteBotDirectory {
    async fn lookup_by_routing_key(&self, key: &str) -> AppResult<Option<BotIdentity>> {
        if !self.admin_token.is_empty() && key == self.admin_token {
            return Ok(Some(BotIdentity::admin(
                self.admin_token.clone(),
                self.admin_username.clone(),
            )));
        }

        let conn = get_connection(&self.pool)?;
        let shop = shops::get_shop_by_token(&conn, key)?;
        Ok(shop.as_ref().map(Self::shop_identity))
    }

    async fn list_active(&self) -> AppResult<Vec<BotIdentity>> {
        let mut identities = Vec::new();
        if !self.admin_token.is_empty() {
            identities.push(BotIdentity::admin(
                self.admin_token.clone(),
                self.admin_username.clone(),
            ));
        }

        let conn = get_connection(&self.pool)?;
        for shop in shops::list_active_shops(&conn)? {
            identities.push(Self::shop_identity(&shop));
        }
        Ok(identities)
    }
}

/// In-memory routing-key → identity cache with directory fallthrough.
pub struct BotRegistry {
    directory: Arc<dyn BotDirectory>,
    by_key: DashMap<String, BotIdentity>,
}

impl BotRegistry {
    pub fn new(directory: Arc<dyn BotDirectory>) -> Self {
        Self {
            directory,
            by_key: DashMap::new(),
        }
    }

    /// Resolves a routing key to an active bot identity.
    ///
    /// `None` means "no such bot" (unknown key or deactivated tenant); the
    /// caller replies with nothing. Directory errors are logged and degrade
    /// to a miss so the dispatch loop never crashes on resolution.
    pub async fn resolve(&self, routing_key: &str) -> Option<BotIdentity> {
        if let Some(identity) = self.by_key.get(routing_key) {
            if identity.active {
                return Some(identity.clone());
            }
            return None;
        }

        match self.directory.lookup_by_routing_key(routing_key).await {
            Ok(Some(identity)) if identity.active => {
                self.by_key.insert(routing_key.to_string(), identity.clone());
                Some(identity)
            }
            Ok(_) => None,
            Err(e) => {
                log::error!("Bot directory lookup failed: {}", e);
                None
            }
        }
    }

    /// Registers an active identity. At most one Admin identity exists at a
    /// time: registering a new one evicts the previous admin entry.
    pub fn register_active(&self, identity: BotIdentity) {
        if identity.kind == BotKind::Admin {
            self.by_key
                .retain(|_, existing| existing.kind != BotKind::Admin || existing.token == identity.token);
        }
        self.by_key.insert(identity.token.clone(), identity);
    }

    /// Marks a tenant's identity inactive; its routing key stops resolving.
    pub fn deactivate(&self, tenant_id: TenantId) {
        for mut entry in self.by_key.iter_mut() {
            if entry.tenant_id == Some(tenant_id) {
                entry.active = false;
            }
        }
    }

    /// Re-syncs the cache from the directory: activates everything the
    /// directory lists and deactivates cached tenants it no longer does.
    pub async fn refresh(&self) -> AppResult<usize> {
        let listed = self.directory.list_active().await?;

        self.by_key.retain(|_, cached| {
            cached.kind == BotKind::Admin || listed.iter().any(|identity| identity.token == cached.token)
        });
        let count = listed.len();
        for identity in listed {
            self.register_active(identity);
        }
        Ok(count)
    }

    /// Number of cached identities (active and not).
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyDirectory;

    #[async_trait]
    impl BotDirectory for EmptyDirectory {
        async fn lookup_by_routing_key(&self, _key: &str) -> AppResult<Option<BotIdentity>> {
            Ok(None)
        }

        async fn list_active(&self) -> AppResult<Vec<BotIdentity>> {
            Ok(Vec::new())
        }
    }

    fn tenant_identity(id: i64, token: &str) -> BotIdentity {
        BotIdentity {
            tenant_id: Some(TenantId(id)),
            token: token.to_string(),
            username: None,
            kind: BotKind::Tenant,
            active: true,
        }
    }

    #[tokio::test]
    async fn unknown_key_is_a_typed_miss() {
        let registry = BotRegistry::new(Arc::new(EmptyDirectory));
        assert_eq!(registry.resolve("no-such-token").await, None);
    }

    #[tokio::test]
    async fn registered_identity_resolves_until_deactivated() {
        let registry = BotRegistry::new(Arc::new(EmptyDirectory));
        registry.register_active(tenant_identity(1, "tok:1"));

        let resolved = registry.resolve("tok:1").await.unwrap();
        assert_eq!(resolved.tenant_id, Some(TenantId(1)));

        registry.deactivate(TenantId(1));
        assert_eq!(registry.resolve("tok:1").await, None);
    }

    #[tokio::test]
    async fn only_one_admin_identity_at_a_time() {
        let registry = BotRegistry::new(Arc::new(EmptyDirectory));
        registry.register_active(BotIdentity::admin("admin:1", None));
        registry.register_active(BotIdentity::admin("admin:2", None));

        assert_eq!(registry.resolve("admin:1").await, None);
        let current = registry.resolve("admin:2").await.unwrap();
        assert_eq!(current.kind, BotKind::Admin);
        assert_eq!(registry.len(), 1);
    }
}
