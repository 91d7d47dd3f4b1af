//! End-to-end scenarios through the processor: whole conversations against a
//! real SQLite store, admin and tenant bots side by side.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::fixtures::*;
use common::{admin_identity, tenant_identity, TestEnv};
use pretty_assertions::assert_eq;

use florabot::telegram::handlers::{tenant_handler_set, CommandHandler, HandlerDeps, HandlerSet};
use florabot::telegram::{Dispatcher, InboundMessage, OutboundAction, OutboundResponse};
use floracore::error::{AppError, AppResult};
use floracore::session::{Session, SessionKey, SessionState, SessionStore};
use floracore::storage::{catalog, shops};
use floracore::types::BotIdentity;

async fn send(env: &TestEnv, identity: &BotIdentity, update: teloxide::types::Update) -> Option<OutboundResponse> {
    env.processor.process(identity, &update).await.unwrap()
}

fn text_of(response: &OutboundResponse) -> &str {
    response.primary_text().unwrap()
}

#[tokio::test]
async fn admin_start_welcomes_without_touching_state() {
    let env = TestEnv::new();
    let admin = admin_identity();

    let response = send(&env, &admin, message_update(5, 5, "/start")).await.unwrap();
    let text = text_of(&response);
    assert!(text.contains("/register"));
    assert!(text.contains("/myshops"));
    assert!(text.contains("/newshop"));

    let session = env.session(&SessionKey::admin(5)).await;
    assert_eq!(session.state, SessionState::New);
}

#[tokio::test]
async fn tenant_start_transitions_to_main_menu_and_persists() {
    let env = TestEnv::new();
    env.seed_owner(1);
    let shop_id = env.seed_shop(1, "Roses", "20000:TenantSecretToken");
    let shop = tenant_identity(shop_id, "20000:TenantSecretToken");

    let response = send(&env, &shop, message_update(7, 7, "/start")).await.unwrap();
    let text = text_of(&response);
    assert!(text.contains("/catalog"));
    assert!(text.contains("/cart"));
    assert!(text.contains("/orders"));

    let session = env
        .session(&SessionKey::new(shop.tenant_id, 7))
        .await;
    assert_eq!(session.state, SessionState::MainMenu);
}

#[tokio::test]
async fn registration_flow_walks_to_completion() {
    let env = TestEnv::new();
    let admin = admin_identity();

    let response = send(&env, &admin, message_update(5, 5, "/register")).await.unwrap();
    assert!(text_of(&response).contains("name"));

    send(&env, &admin, message_update(5, 5, "Anna Petrova")).await.unwrap();
    send(&env, &admin, message_update(5, 5, "+7 999 000-11-22")).await.unwrap();

    // A bad email keeps the session on the same step.
    let retry = send(&env, &admin, message_update(5, 5, "not-an-email")).await.unwrap();
    assert!(text_of(&retry).contains("email"));

    send(&env, &admin, message_update(5, 5, "anna@example.com")).await.unwrap();
    let confirm = send(&env, &admin, message_update(5, 5, "Moscow")).await.unwrap();
    assert!(text_of(&confirm).contains("Anna Petrova"));

    let done = send(&env, &admin, message_update(5, 5, "yes")).await.unwrap();
    assert!(text_of(&done).contains("/newshop"));

    let session = env.session(&SessionKey::admin(5)).await;
    assert_eq!(session.state, SessionState::MainMenu);
    assert_eq!(session.attributes.get("owner_registered").map(String::as_str), Some("true"));

    let conn = env.pool.get().unwrap();
    let owner = shops::get_owner(&conn, 5).unwrap().unwrap();
    assert_eq!(owner.name, "Anna Petrova");
    assert_eq!(owner.city, "Moscow");
}

#[tokio::test]
async fn shop_setup_flow_creates_an_active_shop() {
    let env = TestEnv::new();
    let admin = admin_identity();
    env.authenticate_owner(5).await;

    send(&env, &admin, message_update(5, 5, "/newshop")).await.unwrap();
    send(&env, &admin, message_update(5, 5, "Roses & Co")).await.unwrap();
    send(&env, &admin, message_update(5, 5, "Fresh flowers daily")).await.unwrap();

    // Token format is validated before it is accepted.
    let retry = send(&env, &admin, message_update(5, 5, "not a token")).await.unwrap();
    assert!(text_of(&retry).contains("BotFather"));

    send(&env, &admin, message_update(5, 5, "20001:ShopSecretToken")).await.unwrap();
    send(&env, &admin, message_update(5, 5, "Main st 1")).await.unwrap();
    let confirm = send(&env, &admin, message_update(5, 5, "9:00-21:00")).await.unwrap();
    assert!(text_of(&confirm).contains("Roses & Co"));

    // Confirm via the inline button; the reply edits the card in place and
    // the spinner is dismissed through the auto-appended callback answer.
    let done = send(&env, &admin, callback_update(5, 5, "setup:confirm")).await.unwrap();
    assert!(matches!(done.primary, OutboundAction::EditText { .. }));
    assert!(done
        .auxiliary
        .iter()
        .any(|action| matches!(action, OutboundAction::AnswerCallback { .. })));

    let conn = env.pool.get().unwrap();
    let shop = shops::get_shop_by_token(&conn, "20001:ShopSecretToken").unwrap().unwrap();
    assert!(shop.active);
    assert_eq!(shop.owner_id, 5);
    assert_eq!(shop.name, "Roses & Co");

    let session = env.session(&SessionKey::admin(5)).await;
    assert_eq!(session.state, SessionState::MainMenu);
}

#[tokio::test]
async fn customer_shops_checks_out_and_cancels_the_order() {
    let env = TestEnv::new();
    env.seed_owner(1);
    let shop_id = env.seed_shop(1, "Roses", "20000:TenantSecretToken");
    let rose_id = env.seed_product(shop_id, "Red Roses Bouquet", 2500);
    env.seed_product(shop_id, "Tulip Mix", 1800);
    let shop = tenant_identity(shop_id, "20000:TenantSecretToken");
    let key = SessionKey::new(shop.tenant_id, 7);

    send(&env, &shop, message_update(7, 7, "/start")).await.unwrap();

    // Add to cart twice: quantity accumulates on one line.
    send(&env, &shop, callback_update(7, 7, &format!("prod:add:{rose_id}"))).await.unwrap();
    send(&env, &shop, callback_update(7, 7, &format!("prod:add:{rose_id}"))).await.unwrap();

    let cart = send(&env, &shop, message_update(7, 7, "/cart")).await.unwrap();
    let cart_text = text_of(&cart);
    assert!(cart_text.contains("Red Roses Bouquet"));
    assert!(cart_text.contains("50.00"), "expected the 2×25.00 total in: {cart_text}");

    send(&env, &shop, callback_update(7, 7, "cart:checkout")).await.unwrap();
    send(&env, &shop, message_update(7, 7, "Main st 1, apt 2")).await.unwrap();
    let confirm = send(&env, &shop, message_update(7, 7, "+7 999 000-11-22")).await.unwrap();
    assert!(text_of(&confirm).contains("50.00"));

    let placed = send(&env, &shop, message_update(7, 7, "yes")).await.unwrap();
    assert!(text_of(&placed).contains("Order"));

    // Cart cleared, state back at the menu.
    let session = env.session(&key).await;
    assert_eq!(session.state, SessionState::MainMenu);
    assert!(session.attributes.get("cart").is_none());

    let conn = env.pool.get().unwrap();
    let orders = catalog::list_orders_by_customer(&conn, shop_id, 7).unwrap();
    assert_eq!(orders.len(), 1);
    let order_id = orders[0].id;
    assert_eq!(orders[0].status, catalog::OrderStatus::New);
    drop(conn);

    let listed = send(&env, &shop, message_update(7, 7, "/orders")).await.unwrap();
    assert!(text_of(&listed).contains(&format!("#{order_id}")));

    let cancelled = send(&env, &shop, callback_update(7, 7, &format!("order:cancel:{order_id}"))).await.unwrap();
    assert!(text_of(&cancelled).contains("cancelled"));

    let conn = env.pool.get().unwrap();
    let order = catalog::get_order(&conn, order_id).unwrap().unwrap();
    assert_eq!(order.status, catalog::OrderStatus::Cancelled);
}

#[tokio::test]
async fn settings_menu_switches_language_and_notifications() {
    let env = TestEnv::new();
    let admin = admin_identity();
    let key = SessionKey::admin(5);

    send(&env, &admin, message_update(5, 5, "/settings")).await.unwrap();
    assert_eq!(env.session(&key).await.state, SessionState::SettingsMenu);

    // Language can be typed as well as pressed.
    send(&env, &admin, callback_update(5, 5, "settings:language")).await.unwrap();
    let switched = send(&env, &admin, message_update(5, 5, "ru")).await.unwrap();
    assert!(text_of(&switched).contains("Язык"));

    let session = env.session(&key).await;
    assert_eq!(session.language, "ru");
    assert_eq!(session.state, SessionState::MainMenu);

    send(&env, &admin, message_update(5, 5, "/settings")).await.unwrap();
    send(&env, &admin, callback_update(5, 5, "settings:notifications")).await.unwrap();
    let toggled = send(&env, &admin, callback_update(5, 5, "settings:notif-off")).await.unwrap();
    assert!(text_of(&toggled).contains("выключены"));

    let session = env.session(&key).await;
    assert_eq!(session.attributes.get("notifications").map(String::as_str), Some("off"));
    assert_eq!(session.state, SessionState::MainMenu);
}

#[tokio::test]
async fn catalog_search_answers_plain_text() {
    let env = TestEnv::new();
    env.seed_owner(1);
    let shop_id = env.seed_shop(1, "Roses", "20000:TenantSecretToken");
    env.seed_product(shop_id, "Red Roses Bouquet", 2500);
    env.seed_product(shop_id, "Tulip Mix", 1800);
    let shop = tenant_identity(shop_id, "20000:TenantSecretToken");

    send(&env, &shop, message_update(7, 7, "/start")).await.unwrap();
    let hits = send(&env, &shop, message_update(7, 7, "roses")).await.unwrap();

    match &hits.primary {
        OutboundAction::SendText { buttons, .. } => {
            assert_eq!(buttons.len(), 1);
            assert!(buttons[0][0].0.contains("Red Roses Bouquet"));
        }
        other => panic!("expected a button list, got {other:?}"),
    }
}

#[tokio::test]
async fn webapp_order_places_immediately() {
    let env = TestEnv::new();
    env.seed_owner(1);
    let shop_id = env.seed_shop(1, "Roses", "20000:TenantSecretToken");
    let rose_id = env.seed_product(shop_id, "Red Roses Bouquet", 2500);
    let shop = tenant_identity(shop_id, "20000:TenantSecretToken");

    let payload = serde_json::json!({
        "type": "order",
        "items": [{ "product_id": rose_id, "quantity": 3 }],
        "address": "Main st 1",
        "phone": "+79990001122"
    });
    let placed = send(&env, &shop, webapp_update(7, 7, &payload)).await.unwrap();
    assert!(text_of(&placed).contains("Order"));

    let conn = env.pool.get().unwrap();
    let orders = catalog::list_orders_by_customer(&conn, shop_id, 7).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items[0].quantity, 3);
}

// ---------------------------------------------------------------------------
// Handler exception scenario at the processor level
// ---------------------------------------------------------------------------

struct MutateThenFailCommand;

#[async_trait]
impl CommandHandler for MutateThenFailCommand {
    fn command(&self) -> &'static str {
        "explode"
    }

    async fn handle(
        &self,
        _msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        session.state = SessionState::SettingsMenu;
        session.attributes.insert("poison".into(), "true".into());
        Err(AppError::Validation("mid-execution failure".into()))
    }
}

#[tokio::test]
async fn failing_handler_sends_one_generic_error_and_persists_nothing() {
    let mut admin_set = HandlerSet::new();
    admin_set.register_command(Arc::new(MutateThenFailCommand));
    let env = TestEnv::with_dispatchers(Dispatcher::new(admin_set), Dispatcher::new(tenant_handler_set()));
    let admin = admin_identity();

    let response = send(&env, &admin, message_update(5, 5, "/explode")).await.unwrap();
    assert!(text_of(&response).contains("Sorry, something went wrong"));
    assert!(response.auxiliary.is_empty(), "exactly one outbound message expected");

    // The store still holds the pre-turn session.
    let session = env.session(&SessionKey::admin(5)).await;
    assert_eq!(session.state, SessionState::New);
    assert!(session.attributes.get("poison").is_none());
}

#[tokio::test]
async fn unroutable_update_produces_no_reply_and_no_session() {
    let env = TestEnv::new();
    let admin = admin_identity();

    let response = send(&env, &admin, edited_message_update(5, 5)).await;
    assert!(response.is_none());

    // No session was created for the dropped update.
    let stale = env
        .sessions
        .find_stale(None, chrono::Utc::now() + chrono::Duration::hours(1), 10, 0)
        .await
        .unwrap();
    assert!(stale.is_empty());
}
