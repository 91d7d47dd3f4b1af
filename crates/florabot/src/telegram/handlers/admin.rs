//! Admin-bot handlers: shop owners register and manage their storefronts.

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;
use serde::Deserialize;

use floracore::error::{AppError, AppResult};
use floracore::i18n;
use floracore::session::state::{
    CategoryDraft, CategoryStep, ProductDraft, ProductStep, RegistrationData, RegistrationStep, SessionState,
    SettingsStep, ShopSetupData, ShopSetupStep, ShopStep,
};
use floracore::session::{FlowData, Session};
use floracore::storage::{catalog, get_connection, shops};

use super::flows::{
    self, cancel_registration, cancel_shop_setup, chat_of, finalize_registration, finalize_shop_setup, lang_of,
    language_buttons, respond,
};
use super::{
    CallbackHandler, CommandHandler, HandlerDeps, TextHandler, WebAppHandler, ATTR_NOTIFICATIONS,
    ATTR_OWNER_REGISTERED,
};
use crate::telegram::response::{ButtonRow, OutboundResponse};
use crate::telegram::update::InboundMessage;

fn is_registered(session: &Session) -> bool {
    session.attributes.get(ATTR_OWNER_REGISTERED).map(String::as_str) == Some("true")
}

/// Loads a shop and checks the caller owns it.
fn owned_shop(deps: &HandlerDeps, msg: &InboundMessage, shop_id: i64) -> AppResult<Option<shops::Shop>> {
    let conn = get_connection(&deps.db_pool)?;
    let shop = shops::get_shop(&conn, shop_id)?;
    Ok(shop.filter(|s| Some(s.owner_id) == msg.user_id))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Welcome copy enumerating the entry commands. Leaves the session in
/// whatever state it was in; a fresh session stays `New`.
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
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "admin.welcome")))
    }
}

/// Starts the owner registration flow.
pub struct RegisterCommand;

#[async_trait]
impl CommandHandler for RegisterCommand {
    fn command(&self) -> &'static str {
        "register"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);

        if is_registered(session) {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "admin.already-registered")));
        }

        session.enter_flow(
            SessionState::Registration(RegistrationStep::Name),
            FlowData::Registration(RegistrationData::default()),
        );
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "reg.ask-name")))
    }
}

/// Lists the owner's shops with management buttons.
pub struct MyShopsCommand;

#[async_trait]
impl CommandHandler for MyShopsCommand {
    fn command(&self) -> &'static str {
        "myshops"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let owner_id = msg
            .user_id
            .ok_or_else(|| AppError::Validation("/myshops without a user id".into()))?;

        let conn = get_connection(&deps.db_pool)?;
        let owned = shops::get_shops_by_owner(&conn, owner_id)?;
        if owned.is_empty() {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "admin.myshops-empty")));
        }

        let buttons: Vec<ButtonRow> = owned
            .iter()
            .map(|shop| {
                let marker = if shop.active { "" } else { " ⏸" };
                vec![(format!("{}{}", shop.name, marker), format!("shop:view:{}", shop.id))]
            })
            .collect();

        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "admin.myshops-header")).with_buttons(buttons))
    }
}

pub struct NewShopCommand;

#[async_trait]
impl CommandHandler for NewShopCommand {
    fn command(&self) -> &'static str {
        "newshop"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);

        session.enter_flow(
            SessionState::ShopSetup(ShopSetupStep::Name),
            FlowData::ShopSetup(ShopSetupData::default()),
        );
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "setup.ask-name")))
    }
}

/// Abandons any flow back to the main menu.
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

/// Shortcut into the language step of the settings flow.
pub struct LanguageCommand;

#[async_trait]
impl CommandHandler for LanguageCommand {
    fn command(&self) -> &'static str {
        "language"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);

        session.enter_flow(SessionState::Settings(SettingsStep::Language), FlowData::None);
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "settings.choose-language")).with_buttons(language_buttons()))
    }
}

/// Settings menu: language and order-notification preferences.
pub struct SettingsCommand;

#[async_trait]
impl CommandHandler for SettingsCommand {
    fn command(&self) -> &'static str {
        "settings"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);

        session.state = SessionState::SettingsMenu;
        session.flow_data = FlowData::None;

        let buttons = vec![
            vec![(i18n::t(&lang, "button.language"), "settings:language".to_string())],
            vec![(i18n::t(&lang, "button.notifications"), "settings:notifications".to_string())],
        ];
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "settings.menu")).with_buttons(buttons))
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Confirm/cancel buttons of the registration flow.
pub struct RegistrationCallback;

#[async_trait]
impl CallbackHandler for RegistrationCallback {
    fn prefix(&self) -> &'static str {
        "reg:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let action = msg.callback_data.as_deref().unwrap_or("").trim_start_matches("reg:");

        if session.state != SessionState::Registration(RegistrationStep::Confirm) {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback")));
        }

        match action {
            "confirm" => finalize_registration(msg, session, deps),
            "cancel" => cancel_registration(msg, session),
            _ => Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback"))),
        }
    }
}

pub struct ShopSetupCallback;

#[async_trait]
impl CallbackHandler for ShopSetupCallback {
    fn prefix(&self) -> &'static str {
        "setup:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let action = msg.callback_data.as_deref().unwrap_or("").trim_start_matches("setup:");

        if session.state != SessionState::ShopSetup(ShopSetupStep::Confirm) {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback")));
        }

        match action {
            "confirm" => finalize_shop_setup(msg, session, deps),
            "cancel" => cancel_shop_setup(msg, session),
            _ => Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback"))),
        }
    }
}

/// Shop management menu. Callback data format: `shop:<action>:<shop_id>`.
pub struct ShopCallback;

#[async_trait]
impl CallbackHandler for ShopCallback {
    fn prefix(&self) -> &'static str {
        "shop:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);

        let data = msg.callback_data.as_deref().unwrap_or("");
        let parts: Vec<&str> = data.split(':').collect();
        let action = parts.get(1).copied().unwrap_or("");
        let shop_id: i64 = parts.get(2).and_then(|raw| raw.parse().ok()).unwrap_or(0);

        let Some(shop) = owned_shop(deps, msg, shop_id)? else {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "shop.not-found")));
        };

        match action {
            "view" => {
                let mut args = FluentArgs::new();
                args.set("name", shop.name.clone());
                args.set("description", shop.description.clone().unwrap_or_else(|| "—".into()));
                args.set("address", shop.address.clone().unwrap_or_else(|| "—".into()));
                args.set("hours", shop.working_hours.clone().unwrap_or_else(|| "—".into()));
                args.set(
                    "status",
                    i18n::t(&lang, if shop.active { "shop.status-active" } else { "shop.status-paused" }),
                );

                let buttons = vec![
                    vec![
                        (i18n::t(&lang, "button.edit-name"), format!("shop:name:{shop_id}")),
                        (i18n::t(&lang, "button.edit-description"), format!("shop:desc:{shop_id}")),
                    ],
                    vec![
                        (i18n::t(&lang, "button.products"), format!("shop:products:{shop_id}")),
                        (i18n::t(&lang, "button.add-product"), format!("product:add:{shop_id}")),
                    ],
                    vec![
                        (i18n::t(&lang, "button.add-category"), format!("category:add:{shop_id}")),
                        (i18n::t(&lang, "button.toggle-active"), format!("shop:toggle:{shop_id}")),
                    ],
                ];
                Ok(respond(msg, chat_id, i18n::t_args(&lang, "shop.view", &args)).with_buttons(buttons))
            }
            "name" => {
                session
                    .attributes
                    .insert(flows::ATTR_SHOP_ID.to_string(), shop_id.to_string());
                session.enter_flow(SessionState::Shop(ShopStep::EditName), FlowData::None);
                Ok(respond(msg, chat_id, i18n::t(&lang, "shop.ask-name")))
            }
            "desc" => {
                session
                    .attributes
                    .insert(flows::ATTR_SHOP_ID.to_string(), shop_id.to_string());
                session.enter_flow(SessionState::Shop(ShopStep::EditDescription), FlowData::None);
                Ok(respond(msg, chat_id, i18n::t(&lang, "shop.ask-description")))
            }
            "toggle" => {
                let conn = get_connection(&deps.db_pool)?;
                shops::set_shop_active(&conn, shop_id, !shop.active)?;
                let key = if shop.active { "shop.deactivated" } else { "shop.activated" };
                Ok(respond(msg, chat_id, i18n::t(&lang, key)))
            }
            "products" => {
                let conn = get_connection(&deps.db_pool)?;
                let products = catalog::list_products(&conn, shop_id)?;
                if products.is_empty() {
                    return Ok(respond(msg, chat_id, i18n::t(&lang, "shop.products-empty")));
                }

                let mut lines = vec![i18n::t(&lang, "shop.products-header")];
                let mut buttons = Vec::new();
                for product in &products {
                    lines.push(format!("• {} — {}", product.name, product.price_display()));
                    buttons.push(vec![(
                        format!("✕ {}", product.name),
                        format!("product:del:{}:{}", shop_id, product.id),
                    )]);
                }
                Ok(respond(msg, chat_id, lines.join("\n")).with_buttons(buttons))
            }
            _ => Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback"))),
        }
    }
}

/// `product:add:<shop_id>` starts the product flow;
/// `product:del:<shop_id>:<product_id>` removes a product.
pub struct ProductCallback;

#[async_trait]
impl CallbackHandler for ProductCallback {
    fn prefix(&self) -> &'static str {
        "product:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);

        let data = msg.callback_data.as_deref().unwrap_or("");
        let parts: Vec<&str> = data.split(':').collect();
        let action = parts.get(1).copied().unwrap_or("");
        let shop_id: i64 = parts.get(2).and_then(|raw| raw.parse().ok()).unwrap_or(0);

        if owned_shop(deps, msg, shop_id)?.is_none() {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "shop.not-found")));
        }

        match action {
            "add" => {
                session.enter_flow(
                    SessionState::Product(ProductStep::Name),
                    FlowData::Product(ProductDraft {
                        shop_id,
                        ..ProductDraft::default()
                    }),
                );
                Ok(respond(msg, chat_id, i18n::t(&lang, "product.ask-name")))
            }
            "del" => {
                let product_id: i64 = parts.get(3).and_then(|raw| raw.parse().ok()).unwrap_or(0);
                let conn = get_connection(&deps.db_pool)?;
                catalog::delete_product(&conn, product_id)?;
                Ok(respond(msg, chat_id, i18n::t(&lang, "product.deleted")))
            }
            _ => Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback"))),
        }
    }
}

/// `category:add:<shop_id>` starts the category flow.
pub struct CategoryCallback;

#[async_trait]
impl CallbackHandler for CategoryCallback {
    fn prefix(&self) -> &'static str {
        "category:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);

        let data = msg.callback_data.as_deref().unwrap_or("");
        let parts: Vec<&str> = data.split(':').collect();
        let action = parts.get(1).copied().unwrap_or("");
        let shop_id: i64 = parts.get(2).and_then(|raw| raw.parse().ok()).unwrap_or(0);

        if action != "add" || owned_shop(deps, msg, shop_id)?.is_none() {
            return Ok(respond(msg, chat_id, i18n::t(&lang, "shop.not-found")));
        }

        session.enter_flow(
            SessionState::Category(CategoryStep::Name),
            FlowData::Category(CategoryDraft { shop_id }),
        );
        Ok(respond(msg, chat_id, i18n::t(&lang, "category.ask-name")))
    }
}

/// Drives the settings menu buttons: entering the language or notifications
/// step, plus the direct on/off toggles.
pub struct SettingsCallback;

#[async_trait]
impl CallbackHandler for SettingsCallback {
    fn prefix(&self) -> &'static str {
        "settings:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let action = msg.callback_data.as_deref().unwrap_or("").trim_start_matches("settings:");

        match action {
            "language" => {
                session.enter_flow(SessionState::Settings(SettingsStep::Language), FlowData::None);
                Ok(respond(msg, chat_id, i18n::t(&lang, "settings.choose-language")).with_buttons(language_buttons()))
            }
            "notifications" => {
                session.enter_flow(SessionState::Settings(SettingsStep::Notifications), FlowData::None);
                let buttons = vec![vec![
                    (i18n::t(&lang, "button.on"), "settings:notif-on".to_string()),
                    (i18n::t(&lang, "button.off"), "settings:notif-off".to_string()),
                ]];
                Ok(respond(msg, chat_id, i18n::t(&lang, "settings.ask-notifications")).with_buttons(buttons))
            }
            "notif-on" | "notif-off" => {
                let enabled = action == "notif-on";
                session
                    .attributes
                    .insert(ATTR_NOTIFICATIONS.to_string(), if enabled { "on" } else { "off" }.to_string());
                if matches!(session.state, SessionState::Settings(_) | SessionState::SettingsMenu) {
                    session.reset_to_menu();
                }
                let key = if enabled { "settings.notifications-on" } else { "settings.notifications-off" };
                Ok(respond(msg, chat_id, i18n::t(&lang, key)))
            }
            _ => Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback"))),
        }
    }
}

pub struct LanguageCallback;

#[async_trait]
impl CallbackHandler for LanguageCallback {
    fn prefix(&self) -> &'static str {
        "lang:"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let code = msg.callback_data.as_deref().unwrap_or("").trim_start_matches("lang:");

        let Some(code) = i18n::is_language_supported(code) else {
            let lang = lang_of(session);
            return Ok(respond(msg, chat_id, i18n::t(&lang, "dispatch.unknown-callback")));
        };

        session.language = code.to_string();
        if matches!(session.state, SessionState::Settings(_) | SessionState::SettingsMenu) {
            session.reset_to_menu();
        }
        let lang = lang_of(session);
        Ok(respond(msg, chat_id, i18n::t(&lang, "settings.language-set")))
    }
}

// ---------------------------------------------------------------------------
// WebApp
// ---------------------------------------------------------------------------

/// Webform mirror of the shop-setup flow: the mini-app submits all fields at
/// once as a `shop_setup` payload.
#[derive(Debug, Deserialize)]
struct ShopSetupPayload {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    description: Option<String>,
    bot_token: String,
    address: Option<String>,
    working_hours: Option<String>,
}

pub struct ShopSetupWebApp;

#[async_trait]
impl WebAppHandler for ShopSetupWebApp {
    fn name(&self) -> &'static str {
        "shop_setup_webapp"
    }

    fn can_handle(&self, msg: &InboundMessage) -> bool {
        msg.web_app_payload
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|value| value.get("type").and_then(|t| t.as_str()).map(|t| t == "shop_setup"))
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
        let owner_id = msg
            .user_id
            .ok_or_else(|| AppError::Validation("webapp submission without a user id".into()))?;

        if !is_registered(session) {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "dispatch.auth-required")));
        }

        let raw = msg.web_app_payload.as_deref().unwrap_or("{}");
        let payload: ShopSetupPayload = serde_json::from_str(raw)?;
        debug_assert_eq!(payload.kind, "shop_setup");

        if payload.name.trim().is_empty() {
            return Err(AppError::Validation("shop setup payload without a name".into()));
        }
        if !flows::looks_like_bot_token(&payload.bot_token) {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "setup.invalid-token")));
        }

        let conn = get_connection(&deps.db_pool)?;
        let shop_id = shops::create_shop(
            &conn,
            owner_id,
            payload.name.trim(),
            payload.description.as_deref(),
            &payload.bot_token,
            payload.address.as_deref(),
            payload.working_hours.as_deref(),
        )?;
        log::info!("Owner {} created shop {} via webapp", owner_id, shop_id);

        let mut args = FluentArgs::new();
        args.set("name", payload.name.trim());
        Ok(OutboundResponse::text(chat_id, i18n::t_args(&lang, "setup.done", &args)))
    }
}

// ---------------------------------------------------------------------------
// Default text
// ---------------------------------------------------------------------------

/// Fallback for plain text no flow claimed: a short hint.
pub struct AdminTextHandler;

#[async_trait]
impl TextHandler for AdminTextHandler {
    fn name(&self) -> &'static str {
        "admin_text"
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "admin.hint")))
    }
}
