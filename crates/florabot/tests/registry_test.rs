//! Bot registry over the SQLite-backed tenant directory.

mod common;

use std::sync::Arc;

use common::TestEnv;
use pretty_assertions::assert_eq;

use florabot::telegram::{BotRegistry, SqliteBotDirectory};
use floracore::storage::shops;
use floracore::types::{BotKind, TenantId};

const ADMIN_TOKEN: &str = "10000:AdminSecretToken";

fn registry_for(env: &TestEnv) -> BotRegistry {
    let directory = Arc::new(SqliteBotDirectory::with_admin_token(Arc::clone(&env.pool), ADMIN_TOKEN));
    BotRegistry::new(directory)
}

#[tokio::test]
async fn admin_token_resolves_to_the_admin_identity() {
    let env = TestEnv::new();
    let registry = registry_for(&env);

    let identity = registry.resolve(ADMIN_TOKEN).await.unwrap();
    assert_eq!(identity.kind, BotKind::Admin);
    assert_eq!(identity.tenant_id, None);
}

#[tokio::test]
async fn unknown_routing_key_is_a_miss_not_an_error() {
    let env = TestEnv::new();
    let registry = registry_for(&env);

    assert_eq!(registry.resolve("55555:NoSuchBotToken").await, None);
}

#[tokio::test]
async fn new_shop_resolves_after_directory_lookup() {
    let env = TestEnv::new();
    env.seed_owner(1);
    let shop_id = env.seed_shop(1, "Roses", "20000:TenantSecretToken");
    let registry = registry_for(&env);

    let identity = registry.resolve("20000:TenantSecretToken").await.unwrap();
    assert_eq!(identity.kind, BotKind::Tenant);
    assert_eq!(identity.tenant_id, Some(TenantId(shop_id)));
}

#[tokio::test]
async fn refresh_picks_up_shops_created_after_startup() {
    let env = TestEnv::new();
    let registry = registry_for(&env);
    registry.refresh().await.unwrap();

    // Created after the bootstrap refresh: a cold resolve still finds it via
    // the directory, and refresh folds it into the cache.
    env.seed_owner(1);
    env.seed_shop(1, "Late Shop", "20002:LateSecretToken");

    let count = registry.refresh().await.unwrap();
    assert_eq!(count, 2); // admin + the new shop
    assert!(registry.resolve("20002:LateSecretToken").await.is_some());
}

#[tokio::test]
async fn deactivated_shop_stops_resolving_after_refresh() {
    let env = TestEnv::new();
    env.seed_owner(1);
    let shop_id = env.seed_shop(1, "Roses", "20000:TenantSecretToken");
    let registry = registry_for(&env);
    registry.refresh().await.unwrap();
    assert!(registry.resolve("20000:TenantSecretToken").await.is_some());

    {
        let conn = env.pool.get().unwrap();
        shops::set_shop_active(&conn, shop_id, false).unwrap();
    }
    registry.refresh().await.unwrap();

    assert_eq!(registry.resolve("20000:TenantSecretToken").await, None);
}
