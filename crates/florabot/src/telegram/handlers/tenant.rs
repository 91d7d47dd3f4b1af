//! Tenant-bot handlers: end customers browsing one shop's catalog, filling a
//! cart, and placing orders.

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;
use serde::Deserialize;

use floracore::error::{AppError, AppResult};
use floracore::i18n;
use floracore::session::state::{OrderDraft, OrderStep, SessionState};
use floracore::session::{FlowData, Session};
use floracore::storage::catalog::{self, OrderItem, OrderStatus};
use floracore::storage::get_connection;

use super::flows::{
    cancel_checkout, cart_items, cart_total_cents, chat_of, finalize_checkout, format_price, lang_of, respond,
    save_cart, tenant_of, text_of,
};
use super::{CallbackHandler, CommandHandler, HandlerDeps, TextHandler, WebAppHandler};
use crate::telegram::response::{ButtonRow, OutboundResponse};
use crate::telegram::update::InboundMessage;

fn product_buttons(products: &[catalog::Product]) -> Vec<ButtonRow> {
    products
        .iter()
        .map(|product| {
            vec![(
                format!("{} — {}", product.name, product.price_display()),
                format!("prod:show:{}", product.id),
            )]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Greets the customer and moves the session to the main menu.
pub struct StartCommand;

#[async_trait]
impl CommandHandler for StartCommand {
    fn command(&self) -> &'static str {
        "start"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        session.reset_to_menu();
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.welcome")))
    }
}

/// Category buttons, or the flat product list for shops without categories.
pub struct CatalogCommand;

#[async_trait]
impl CommandHandler for CatalogCommand {
    fn command(&self) -> &'static str {
        "catalog"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let tenant = tenant_of(msg)?;

        let conn = get_connection(&deps.db_pool)?;
        let categories = catalog::list_categories(&conn, tenant.0)?;

        if categories.is_empty() {
            let products = catalog::list_products(&conn, tenant.0)?;
            if products.is_empty() {
                return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.catalog-empty")));
            }
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.catalog-header"))
                .with_buttons(product_buttons(&products)));
        }

        let buttons: Vec<ButtonRow> = categories
            .iter()
            .map(|category| vec![(category.name.clone(), format!("cat:{}", category.id))])
            .collect();
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.catalog-header")).with_buttons(buttons))
    }
}

pub struct CartCommand;

#[async_trait]
impl CommandHandler for CartCommand {
    fn command(&self) -> &'static str {
        "cart"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);

        let items = cart_items(session);
        if items.is_empty() {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.cart-empty")));
        }

        let mut args = FluentArgs::new();
        args.set("total", format_price(cart_total_cents(&items)));
        let mut lines = vec![i18n::t_args(&lang, "tenant.cart-header", &args)];
        for item in &items {
            lines.push(format!("• {} ×{} — {}", item.name, item.quantity, format_price(item.price_cents * i64::from(item.quantity))));
        }

        let buttons = vec![vec![
            (i18n::t(&lang, "button.checkout"), "cart:checkout".to_string()),
            (i18n::t(&lang, "button.clear"), "cart:clear".to_string()),
        ]];
        Ok(OutboundResponse::text(chat_id, lines.join("\n")).with_buttons(buttons))
    }
}

/// The customer's order history in this shop.
pub struct OrdersCommand;

#[async_trait]
impl CommandHandler for OrdersCommand {
    fn command(&self) -> &'static str {
        "orders"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let tenant = tenant_of(msg)?;
        let customer_id = msg
            .user_id
            .ok_or_else(|| AppError::Validation("/orders without a user id".into()))?;

        let conn = get_connection(&deps.db_pool)?;
        let orders = catalog::list_orders_by_customer(&conn, tenant.0, customer_id)?;
        if orders.is_empty() {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.orders-empty")));
        }

        let mut lines = vec![i18n::t(&lang, "tenant.orders-header")];
        let mut buttons = Vec::new();
        for order in &orders {
            let total: i64 = order.items.iter().map(|i| i.price_cents * i64::from(i.quantity)).sum();
            lines.push(format!("#{} — {} — {}", order.id, order.status, format_price(total)));
            if order.status == OrderStatus::New {
                buttons.push(vec![(
                    format!("✕ #{}", order.id),
                    format!("order:cancel:{}", order.id),
                )]);
            }
        }
        Ok(OutboundResponse::text(chat_id, lines.join("\n")).with_buttons(buttons))
    }
}

pub struct CancelCommand;

#[async_trait]
impl CommandHandler for CancelCommand {
    fn command(&self) -> &'static str {
        "cancel"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        session.reset_to_menu();
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "common.cancelled")))
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

pub struct CategoryCallback;

#[async_trait]
impl CallbackHandler for CategoryCallback {
    fn prefix(&self) -> &'static str {
        "cat:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let tenant = tenant_of(msg)?;
        let category_id: i64 = msg
            .callback_data
            .as_deref()
            .unwrap_or("")
            .trim_start_matches("cat:")
            .parse()
            .unwrap_or(0);

        let conn = get_connection(&deps.db_pool)?;
        let products = catalog::list_products_in_category(&conn, tenant.0, category_id)?;
        if products.is_empty() {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "tenant.catalog-empty")));
        }

        Ok(respond(msg, chat_id, i18n::t(&lang, "tenant.catalog-header"))
            .with_buttons(product_buttons(&products)))
    }
}

/// `prod:show:<id>` shows a product card; `prod:add:<id>` puts it in the cart.
pub struct ProductCallback;

#[async_trait]
impl CallbackHandler for ProductCallback {
    fn prefix(&self) -> &'static str {
        "prod:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let tenant = tenant_of(msg)?;

        let data = msg.callback_data.as_deref().unwrap_or("");
        let parts: Vec<&str> = data.split(':').collect();
        let action = parts.get(1).copied().unwrap_or("");
        let product_id: i64 = parts.get(2).and_then(|raw| raw.parse().ok()).unwrap_or(0);

        let conn = get_connection(&deps.db_pool)?;
        let Some(product) = catalog::get_product(&conn, product_id)?.filter(|p| p.shop_id == tenant.0) else {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "tenant.catalog-empty")));
        };

        match action {
            "show" => {
                let mut args = FluentArgs::new();
                args.set("name", product.name.clone());
                args.set("price", product.price_display());
                let buttons = vec![vec![(
                    i18n::t(&lang, "button.add-to-cart"),
                    format!("prod:add:{}", product.id),
                )]];
                Ok(respond(msg, chat_id, i18n::t_args(&lang, "tenant.product-card", &args)).with_buttons(buttons))
            }
            "add" => {
                let mut items = cart_items(session);
                match items.iter_mut().find(|item| item.product_id == product.id) {
                    Some(item) => item.quantity += 1,
                    None => items.push(OrderItem {
                        product_id: product.id,
                        name: product.name.clone(),
                        price_cents: product.price_cents,
                        quantity: 1,
                    }),
                }
                save_cart(session, &items)?;

                let mut args = FluentArgs::new();
                args.set("name", product.name.clone());
                // A fresh message here, not an edit: the product card stays visible.
                Ok(OutboundResponse::text(chat_id, i18n::t_args(&lang, "tenant.added-to-cart", &args)))
            }
            _ => Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback"))),
        }
    }
}

/// Cancels a still-new order. Must be registered before the broader `order:`
/// prefix: with first-registered-match semantics the registration order of
/// these two is load-bearing.
pub struct OrderCancelCallback;

#[async_trait]
impl CallbackHandler for OrderCancelCallback {
    fn prefix(&self) -> &'static str {
        "order:cancel:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let tenant = tenant_of(msg)?;
        let order_id: i64 = msg
            .callback_data
            .as_deref()
            .unwrap_or("")
            .trim_start_matches("order:cancel:")
            .parse()
            .unwrap_or(0);

        let conn = get_connection(&deps.db_pool)?;
        let order = catalog::get_order(&conn, order_id)?
            .filter(|o| o.shop_id == tenant.0 && Some(o.customer_id) == msg.user_id);
        let Some(order) = order else {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "order.not-found")));
        };

        if order.status != OrderStatus::New {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "order.cannot-cancel")));
        }

        catalog::set_order_status(&conn, order_id, OrderStatus::Cancelled)?;
        let mut args = FluentArgs::new();
        args.set("order", order_id);
        Ok(respond(msg, chat_id, i18n::t_args(&lang, "order.cancelled", &args)))
    }
}

/// Order status card.
pub struct OrderCallback;

#[async_trait]
impl CallbackHandler for OrderCallback {
    fn prefix(&self) -> &'static str {
        "order:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let tenant = tenant_of(msg)?;
        let order_id: i64 = msg
            .callback_data
            .as_deref()
            .unwrap_or("")
            .trim_start_matches("order:")
            .parse()
            .unwrap_or(0);

        let conn = get_connection(&deps.db_pool)?;
        let order = catalog::get_order(&conn, order_id)?
            .filter(|o| o.shop_id == tenant.0 && Some(o.customer_id) == msg.user_id);
        let Some(order) = order else {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "order.not-found")));
        };

        let total: i64 = order.items.iter().map(|i| i.price_cents * i64::from(i.quantity)).sum();
        let mut args = FluentArgs::new();
        args.set("order", order.id);
        args.set("status", order.status.to_string());
        args.set("total", format_price(total));
        Ok(respond(msg, chat_id, i18n::t_args(&lang, "order.status", &args)))
    }
}

/// `cart:checkout` starts the checkout flow, `cart:clear` empties the cart,
/// and `confirm`/`cancel` are the confirm-step buttons.
pub struct CartCallback;

#[async_trait]
impl CallbackHandler for CartCallback {
    fn prefix(&self) -> &'static str {
        "cart:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let action = msg.callback_data.as_deref().unwrap_or("").trim_start_matches("cart:");

        match action {
            "checkout" => {
                if cart_items(session).is_empty() {
                    return Ok(respond(msg, chat_id, i18n::t(&lang, "tenant.cart-empty")));
                }
                session.enter_flow(
                    SessionState::Order(OrderStep::Address),
                    FlowData::Order(OrderDraft::default()),
                );
                Ok(respond(msg, chat_id, i18n::t(&lang, "checkout.ask-address")))
            }
            "clear" => {
                save_cart(session, &[])?;
                Ok(respond(msg, chat_id, i18n::t(&lang, "tenant.cart-cleared")))
            }
            "confirm" if session.state == SessionState::Order(OrderStep::Confirm) => {
                finalize_checkout(msg, session, deps)
            }
            "cancel" if matches!(session.state, SessionState::Order(_)) => cancel_checkout(msg, session),
            _ => Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback"))),
        }
    }
}

// ---------------------------------------------------------------------------
// WebApp
// ---------------------------------------------------------------------------

/// Order submitted from the mini-app webform: `{"type":"order","items":[...]}`.
#[derive(Debug, Deserialize)]
struct OrderPayload {
    #[serde(rename = "type")]
    kind: String,
    items: Vec<OrderPayloadItem>,
    address: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderPayloadItem {
    product_id: i64,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

pub struct OrderWebApp;

#[async_trait]
impl WebAppHandler for OrderWebApp {
    fn name(&self) -> &'static str {
        "order_webapp"
    }

    fn can_handle(&self, msg: &InboundMessage) -> bool {
        msg.web_app_payload
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(|t| t == "order"))
            .unwrap_or(false)
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let tenant = tenant_of(msg)?;
        let customer_id = msg
            .user_id
            .ok_or_else(|| AppError::Validation("webapp order without a user id".into()))?;

        let raw = msg.web_app_payload.as_deref().unwrap_or("{}");
        let payload: OrderPayload = serde_json::from_str(raw)?;
        debug_assert_eq!(payload.kind, "order");

        let conn = get_connection(&deps.db_pool)?;
        let mut items = Vec::new();
        for line in &payload.items {
            let Some(product) = catalog::get_product(&conn, line.product_id)?.filter(|p| p.shop_id == tenant.0) else {
                return Err(AppError::Validation(format!(
                    "webapp order references unknown product {}",
                    line.product_id
                )));
            };
            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                price_cents: product.price_cents,
                quantity: line.quantity.max(1),
            });
        }
        if items.is_empty() {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.cart-empty")));
        }

        let order_id = catalog::create_order(
            &conn,
            tenant.0,
            customer_id,
            &items,
            payload.address.as_deref(),
            payload.phone.as_deref(),
        )?;
        log::info!("Order {} placed in shop {} via webapp", order_id, tenant);

        let mut args = FluentArgs::new();
        args.set("order", order_id);
        Ok(OutboundResponse::text(chat_id, i18n::t_args(&lang, "checkout.done", &args)))
    }
}

// ---------------------------------------------------------------------------
// Default text
// ---------------------------------------------------------------------------

/// Plain text on a tenant bot searches the catalog by product name.
pub struct CatalogSearchHandler;

#[async_trait]
impl TextHandler for CatalogSearchHandler {
    fn name(&self) -> &'static str {
        "catalog_search"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let tenant = tenant_of(msg)?;

        let Some(query) = text_of(msg) else {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.search-empty")));
        };

        let conn = get_connection(&deps.db_pool)?;
        let hits = catalog::search_products(&conn, tenant.0, query)?;
        if hits.is_empty() {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.search-empty")));
        }

        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "tenant.search-header"))
            .with_buttons(product_buttons(&hits)))
    }
}
