//! Multi-turn flow handlers.
//!
//! Each flow owns one family of session states, advances the session one step
//! per inbound message, and returns to `MainMenu` when it completes or is
//! abandoned. Flows receive the full normalized update (not just text) so
//! they can re-prompt on unexpected message shapes.

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;

use floracore::error::{AppError, AppResult};
use floracore::i18n::{self, LanguageIdentifier};
use floracore::session::state::{
    CategoryStep, OrderStep, ProductStep, RegistrationStep, SessionState, SettingsStep, ShopSetupStep, ShopStep,
};
use floracore::session::{FlowData, Session};
use floracore::storage::catalog::{self, OrderItem};
use floracore::storage::{get_connection, shops};
use floracore::types::TenantId;

use super::{FlowHandler, HandlerDeps, ATTR_CART, ATTR_NOTIFICATIONS, ATTR_OWNER_REGISTERED};
use crate::telegram::response::{ButtonRow, OutboundResponse};
use crate::telegram::update::{InboundMessage, MessageKind};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(super) fn lang_of(session: &Session) -> LanguageIdentifier {
    i18n::lang_from_code(&session.language)
}

/// Chat id is guaranteed by the processor's routability check; the error path
/// only fires for hand-built messages in handler unit tests.
pub(super) fn chat_of(msg: &InboundMessage) -> AppResult<i64> {
    msg.chat_id.ok_or_else(|| AppError::Validation("message has no chat".into()))
}

pub(super) fn tenant_of(msg: &InboundMessage) -> AppResult<TenantId> {
    msg.tenant_id
        .ok_or_else(|| AppError::Validation("tenant handler invoked outside a tenant scope".into()))
}

/// Trimmed text payload of the update, if it carries one.
pub(super) fn text_of(msg: &InboundMessage) -> Option<&str> {
    let text = msg.raw_text.as_deref()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Replies in place for callback turns, as a fresh message otherwise.
pub(super) fn respond(msg: &InboundMessage, chat_id: i64, text: String) -> OutboundResponse {
    match (msg.kind, msg.message_id) {
        (MessageKind::CallbackQuery, Some(message_id)) => OutboundResponse::edit_text(chat_id, message_id, text),
        _ => OutboundResponse::text(chat_id, text),
    }
}

pub(super) fn is_valid_phone(raw: &str) -> bool {
    let stripped: String = raw.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')')).collect();
    let digits = stripped.strip_prefix('+').unwrap_or(&stripped);
    !digits.is_empty() && digits.len() >= 6 && digits.len() <= 15 && digits.chars().all(|c| c.is_ascii_digit())
}

pub(super) fn is_valid_email(raw: &str) -> bool {
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Telegram bot tokens look like `<bot id>:<secret>`.
pub(super) fn looks_like_bot_token(raw: &str) -> bool {
    match raw.split_once(':') {
        Some((id, secret)) => {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && secret.len() >= 10
        }
        None => false,
    }
}

/// Parses a user-entered price ("25", "25.5", "25.50") into cents.
pub(super) fn parse_price_cents(raw: &str) -> Option<i64> {
    let raw = raw.trim().replace(',', ".");
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw.as_str(), ""),
    };
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    let cents = whole.checked_mul(100)?.checked_add(frac)?;
    if cents > 0 {
        Some(cents)
    } else {
        None
    }
}

pub(super) fn format_price(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Yes/no interpretation of a confirm-step text reply.
pub(super) fn confirm_answer(text: &str) -> Option<bool> {
    match text.to_lowercase().as_str() {
        "yes" | "y" | "да" => Some(true),
        "no" | "n" | "нет" => Some(false),
        _ => None,
    }
}

pub(super) fn confirm_buttons(lang: &LanguageIdentifier, confirm_data: &str, cancel_data: &str) -> Vec<ButtonRow> {
    vec![vec![
        (i18n::t(lang, "button.confirm"), confirm_data.to_string()),
        (i18n::t(lang, "button.cancel"), cancel_data.to_string()),
    ]]
}

/// One button per supported language, callback data `lang:<code>`.
pub(super) fn language_buttons() -> Vec<ButtonRow> {
    i18n::SUPPORTED_LANGS
        .iter()
        .map(|(code, name)| vec![((*name).to_string(), format!("lang:{code}"))])
        .collect()
}

pub(super) fn cart_items(session: &Session) -> Vec<OrderItem> {
    session
        .attributes
        .get(ATTR_CART)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

pub(super) fn save_cart(session: &mut Session, items: &[OrderItem]) -> AppResult<()> {
    if items.is_empty() {
        session.attributes.remove(ATTR_CART);
    } else {
        session.attributes.insert(ATTR_CART.to_string(), serde_json::to_string(items)?);
    }
    Ok(())
}

pub(super) fn cart_total_cents(items: &[OrderItem]) -> i64 {
    items.iter().map(|item| item.price_cents * i64::from(item.quantity)).sum()
}

// ---------------------------------------------------------------------------
// Registration flow (admin bot)
// ---------------------------------------------------------------------------

/// Completes registration: persists the owner and unlocks gated commands.
pub(super) fn finalize_registration(
    msg: &InboundMessage,
    session: &mut Session,
    deps: &HandlerDeps,
) -> AppResult<OutboundResponse> {
    let chat_id = chat_of(msg)?;
    let lang = lang_of(session);
    let user_id = msg
        .user_id
        .ok_or_else(|| AppError::Validation("registration without a user id".into()))?;

    let data = match &session.flow_data {
        FlowData::Registration(data) => data.clone(),
        _ => return Err(AppError::Validation("registration confirm without flow data".into())),
    };
    let (Some(name), Some(phone), Some(email), Some(city)) = (data.name, data.phone, data.email, data.city) else {
        return Err(AppError::Validation("registration confirm with missing fields".into()));
    };

    let conn = get_connection(&deps.db_pool)?;
    shops::create_owner(
        &conn,
        &shops::Owner {
            telegram_id: user_id,
            name,
            phone,
            email,
            city,
        },
    )?;

    session.attributes.insert(ATTR_OWNER_REGISTERED.to_string(), "true".to_string());
    session.reset_to_menu();
    log::info!("Owner {} completed registration", user_id);
    Ok(respond(msg, chat_id, i18n::t(&lang, "reg.done")))
}

pub(super) fn cancel_registration(msg: &InboundMessage, session: &mut Session) -> AppResult<OutboundResponse> {
    let chat_id = chat_of(msg)?;
    let lang = lang_of(session);
    session.reset_to_menu();
    Ok(respond(msg, chat_id, i18n::t(&lang, "reg.cancelled")))
}

pub struct RegistrationFlow;

#[async_trait]
impl FlowHandler for RegistrationFlow {
    fn name(&self) -> &'static str {
        "registration_flow"
    }

    fn owns(&self, state: &SessionState) -> bool {
        matches!(state, SessionState::Registration(_))
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let SessionState::Registration(step) = session.state else {
            return Err(AppError::Validation("registration flow outside its state".into()));
        };

        let Some(text) = text_of(msg) else {
            // Photos, stickers, empty captions: re-prompt the current step.
            let key = match step {
                RegistrationStep::Name => "reg.ask-name",
                RegistrationStep::Phone => "reg.ask-phone",
                RegistrationStep::Email => "reg.ask-email",
                RegistrationStep::City => "reg.ask-city",
                RegistrationStep::Confirm => "reg.confirm-hint",
            };
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, key)));
        };

        match step {
            RegistrationStep::Name => {
                if let Some(data) = session.flow_data.as_registration_mut() {
                    data.name = Some(text.to_string());
                }
                session.state = SessionState::Registration(RegistrationStep::Phone);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "reg.ask-phone")))
            }
            RegistrationStep::Phone => {
                if !is_valid_phone(text) {
                    return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "reg.invalid-phone")));
                }
                if let Some(data) = session.flow_data.as_registration_mut() {
                    data.phone = Some(text.to_string());
                }
                session.state = SessionState::Registration(RegistrationStep::Email);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "reg.ask-email")))
            }
            RegistrationStep::Email => {
                if !is_valid_email(text) {
                    return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "reg.invalid-email")));
                }
                if let Some(data) = session.flow_data.as_registration_mut() {
                    data.email = Some(text.to_string());
                }
                session.state = SessionState::Registration(RegistrationStep::City);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "reg.ask-city")))
            }
            RegistrationStep::City => {
                if let Some(data) = session.flow_data.as_registration_mut() {
                    data.city = Some(text.to_string());
                }
                session.state = SessionState::Registration(RegistrationStep::Confirm);

                let summary = match &session.flow_data {
                    FlowData::Registration(data) => {
                        let mut args = FluentArgs::new();
                        args.set("name", data.name.clone().unwrap_or_default());
                        args.set("phone", data.phone.clone().unwrap_or_default());
                        args.set("email", data.email.clone().unwrap_or_default());
                        args.set("city", data.city.clone().unwrap_or_default());
                        i18n::t_args(&lang, "reg.confirm", &args)
                    }
                    _ => i18n::t(&lang, "reg.confirm-hint"),
                };
                Ok(OutboundResponse::text(chat_id, summary)
                    .with_buttons(confirm_buttons(&lang, "reg:confirm", "reg:cancel")))
            }
            RegistrationStep::Confirm => match confirm_answer(text) {
                Some(true) => finalize_registration(msg, session, deps),
                Some(false) => cancel_registration(msg, session),
                None => Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "reg.confirm-hint"))),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Shop-setup flow (admin bot)
// ---------------------------------------------------------------------------

/// Completes shop setup: inserts the active shop row. The registry's
/// periodic directory re-sync picks the new bot up from there.
pub(super) fn finalize_shop_setup(
    msg: &InboundMessage,
    session: &mut Session,
    deps: &HandlerDeps,
) -> AppResult<OutboundResponse> {
    let chat_id = chat_of(msg)?;
    let lang = lang_of(session);
    let owner_id = msg
        .user_id
        .ok_or_else(|| AppError::Validation("shop setup without a user id".into()))?;

    let data = match &session.flow_data {
        FlowData::ShopSetup(data) => data.clone(),
        _ => return Err(AppError::Validation("shop setup confirm without flow data".into())),
    };
    let (Some(name), Some(bot_token)) = (data.name, data.bot_token) else {
        return Err(AppError::Validation("shop setup confirm with missing fields".into()));
    };

    let conn = get_connection(&deps.db_pool)?;
    let shop_id = shops::create_shop(
        &conn,
        owner_id,
        &name,
        data.description.as_deref(),
        &bot_token,
        data.address.as_deref(),
        data.working_hours.as_deref(),
    )?;

    session.reset_to_menu();
    log::info!("Owner {} created shop {} ({})", owner_id, shop_id, name);

    let mut args = FluentArgs::new();
    args.set("name", name);
    Ok(respond(msg, chat_id, i18n::t_args(&lang, "setup.done", &args)))
}

pub(super) fn cancel_shop_setup(msg: &InboundMessage, session: &mut Session) -> AppResult<OutboundResponse> {
    let chat_id = chat_of(msg)?;
    let lang = lang_of(session);
    session.reset_to_menu();
    Ok(respond(msg, chat_id, i18n::t(&lang, "setup.cancelled")))
}

/// "-" in an optional step skips it.
fn optional_field(text: &str) -> Option<String> {
    if text == "-" {
        None
    } else {
        Some(text.to_string())
    }
}

pub struct ShopSetupFlow;

#[async_trait]
impl FlowHandler for ShopSetupFlow {
    fn name(&self) -> &'static str {
        "shop_setup_flow"
    }

    fn owns(&self, state: &SessionState) -> bool {
        matches!(state, SessionState::ShopSetup(_))
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let SessionState::ShopSetup(step) = session.state else {
            return Err(AppError::Validation("shop setup flow outside its state".into()));
        };

        let Some(text) = text_of(msg) else {
            let key = match step {
                ShopSetupStep::Name => "setup.ask-name",
                ShopSetupStep::Description => "setup.ask-description",
                ShopSetupStep::BotToken => "setup.ask-token",
                ShopSetupStep::Address => "setup.ask-address",
                ShopSetupStep::WorkingHours => "setup.ask-hours",
                ShopSetupStep::Confirm => "setup.confirm-hint",
            };
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, key)));
        };

        match step {
            ShopSetupStep::Name => {
                if let Some(data) = session.flow_data.as_shop_setup_mut() {
                    data.name = Some(text.to_string());
                }
                session.state = SessionState::ShopSetup(ShopSetupStep::Description);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "setup.ask-description")))
            }
            ShopSetupStep::Description => {
                if let Some(data) = session.flow_data.as_shop_setup_mut() {
                    data.description = optional_field(text);
                }
                session.state = SessionState::ShopSetup(ShopSetupStep::BotToken);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "setup.ask-token")))
            }
            ShopSetupStep::BotToken => {
                if !looks_like_bot_token(text) {
                    return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "setup.invalid-token")));
                }
                if let Some(data) = session.flow_data.as_shop_setup_mut() {
                    data.bot_token = Some(text.to_string());
                }
                session.state = SessionState::ShopSetup(ShopSetupStep::Address);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "setup.ask-address")))
            }
            ShopSetupStep::Address => {
                if let Some(data) = session.flow_data.as_shop_setup_mut() {
                    data.address = optional_field(text);
                }
                session.state = SessionState::ShopSetup(ShopSetupStep::WorkingHours);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "setup.ask-hours")))
            }
            ShopSetupStep::WorkingHours => {
                if let Some(data) = session.flow_data.as_shop_setup_mut() {
                    data.working_hours = optional_field(text);
                }
                session.state = SessionState::ShopSetup(ShopSetupStep::Confirm);

                let name = match &session.flow_data {
                    FlowData::ShopSetup(data) => data.name.clone().unwrap_or_default(),
                    _ => String::new(),
                };
                let mut args = FluentArgs::new();
                args.set("name", name);
                Ok(OutboundResponse::text(chat_id, i18n::t_args(&lang, "setup.confirm", &args))
                    .with_buttons(confirm_buttons(&lang, "setup:confirm", "setup:cancel")))
            }
            ShopSetupStep::Confirm => match confirm_answer(text) {
                Some(true) => finalize_shop_setup(msg, session, deps),
                Some(false) => cancel_shop_setup(msg, session),
                None => Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "setup.confirm-hint"))),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Shop edit flow (admin bot)
// ---------------------------------------------------------------------------

/// Session attribute holding the shop a management flow is editing.
pub(super) const ATTR_SHOP_ID: &str = "shop_id";

pub(super) fn editing_shop_id(session: &Session) -> Option<i64> {
    session.attributes.get(ATTR_SHOP_ID).and_then(|raw| raw.parse().ok())
}

pub struct ShopEditFlow;

#[async_trait]
impl FlowHandler for ShopEditFlow {
    fn name(&self) -> &'static str {
        "shop_edit_flow"
    }

    fn owns(&self, state: &SessionState) -> bool {
        matches!(state, SessionState::Shop(_))
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let SessionState::Shop(step) = session.state else {
            return Err(AppError::Validation("shop edit flow outside its state".into()));
        };

        let Some(shop_id) = editing_shop_id(session) else {
            session.reset_to_menu();
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "shop.not-found")));
        };
        let Some(text) = text_of(msg) else {
            let key = match step {
                ShopStep::EditName => "shop.ask-name",
                ShopStep::EditDescription => "shop.ask-description",
            };
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, key)));
        };

        let conn = get_connection(&deps.db_pool)?;
        let reply = match step {
            ShopStep::EditName => {
                shops::update_shop_name(&conn, shop_id, text)?;
                i18n::t(&lang, "shop.name-updated")
            }
            ShopStep::EditDescription => {
                shops::update_shop_description(&conn, shop_id, text)?;
                i18n::t(&lang, "shop.description-updated")
            }
        };

        session.attributes.remove(ATTR_SHOP_ID);
        session.reset_to_menu();
        Ok(OutboundResponse::text(chat_id, reply))
    }
}

// ---------------------------------------------------------------------------
// Product / category flows (admin bot)
// ---------------------------------------------------------------------------

pub struct ProductFlow;

#[async_trait]
impl FlowHandler for ProductFlow {
    fn name(&self) -> &'static str {
        "product_flow"
    }

    fn owns(&self, state: &SessionState) -> bool {
        matches!(state, SessionState::Product(_))
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let SessionState::Product(step) = session.state else {
            return Err(AppError::Validation("product flow outside its state".into()));
        };

        let Some(text) = text_of(msg) else {
            let key = match step {
                ProductStep::Name => "product.ask-name",
                ProductStep::Price => "product.ask-price",
            };
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, key)));
        };

        match step {
            ProductStep::Name => {
                if let Some(draft) = session.flow_data.as_product_mut() {
                    draft.name = Some(text.to_string());
                }
                session.state = SessionState::Product(ProductStep::Price);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "product.ask-price")))
            }
            ProductStep::Price => {
                let Some(price_cents) = parse_price_cents(text) else {
                    return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "product.invalid-price")));
                };
                let draft = match &session.flow_data {
                    FlowData::Product(draft) => draft.clone(),
                    _ => return Err(AppError::Validation("product price without a draft".into())),
                };
                let name = draft
                    .name
                    .ok_or_else(|| AppError::Validation("product price before a name".into()))?;

                let conn = get_connection(&deps.db_pool)?;
                catalog::create_product(&conn, draft.shop_id, draft.category_id, &name, price_cents)?;

                session.reset_to_menu();
                let mut args = FluentArgs::new();
                args.set("name", name);
                Ok(OutboundResponse::text(chat_id, i18n::t_args(&lang, "product.created", &args)))
            }
        }
    }
}

pub struct CategoryFlow;

#[async_trait]
impl FlowHandler for CategoryFlow {
    fn name(&self) -> &'static str {
        "category_flow"
    }

    fn owns(&self, state: &SessionState) -> bool {
        matches!(state, SessionState::Category(_))
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let SessionState::Category(CategoryStep::Name) = session.state else {
            return Err(AppError::Validation("category flow outside its state".into()));
        };

        let Some(text) = text_of(msg) else {
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "category.ask-name")));
        };

        let shop_id = match &session.flow_data {
            FlowData::Category(draft) => draft.shop_id,
            _ => return Err(AppError::Validation("category flow without a draft".into())),
        };

        let conn = get_connection(&deps.db_pool)?;
        catalog::create_category(&conn, shop_id, text)?;

        session.reset_to_menu();
        let mut args = FluentArgs::new();
        args.set("name", text);
        Ok(OutboundResponse::text(chat_id, i18n::t_args(&lang, "category.created", &args)))
    }
}

// ---------------------------------------------------------------------------
// Settings flow (admin bot)
// ---------------------------------------------------------------------------

/// Typed answers for the settings steps. The inline buttons shown with the
/// prompts go through the `lang:`/`settings:` callbacks instead.
pub struct SettingsFlow;

#[async_trait]
impl FlowHandler for SettingsFlow {
    fn name(&self) -> &'static str {
        "settings_flow"
    }

    fn owns(&self, state: &SessionState) -> bool {
        matches!(state, SessionState::Settings(_))
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        _deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let SessionState::Settings(step) = session.state else {
            return Err(AppError::Validation("settings flow outside its state".into()));
        };

        let Some(text) = text_of(msg) else {
            let key = match step {
                SettingsStep::Language => "settings.choose-language",
                SettingsStep::Notifications => "settings.ask-notifications",
            };
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, key)));
        };

        match step {
            SettingsStep::Language => match i18n::is_language_supported(text) {
                Some(code) => {
                    session.language = code.to_string();
                    session.reset_to_menu();
                    let lang = lang_of(session);
                    Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "settings.language-set")))
                }
                None => Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "settings.choose-language"))
                    .with_buttons(language_buttons())),
            },
            SettingsStep::Notifications => {
                let enabled = match text.to_lowercase().as_str() {
                    "on" | "вкл" => true,
                    "off" | "выкл" => false,
                    _ => {
                        return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "settings.ask-notifications")));
                    }
                };
                session
                    .attributes
                    .insert(ATTR_NOTIFICATIONS.to_string(), if enabled { "on" } else { "off" }.to_string());
                session.reset_to_menu();
                let key = if enabled { "settings.notifications-on" } else { "settings.notifications-off" };
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, key)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Checkout flow (tenant bots)
// ---------------------------------------------------------------------------

/// Places the order from the session's cart and checkout data.
pub(super) fn finalize_checkout(
    msg: &InboundMessage,
    session: &mut Session,
    deps: &HandlerDeps,
) -> AppResult<OutboundResponse> {
    let chat_id = chat_of(msg)?;
    let lang = lang_of(session);
    let tenant = tenant_of(msg)?;
    let customer_id = msg
        .user_id
        .ok_or_else(|| AppError::Validation("checkout without a user id".into()))?;

    let items = cart_items(session);
    if items.is_empty() {
        session.reset_to_menu();
        return Ok(respond(msg, chat_id, i18n::t(&lang, "checkout.empty-cart")));
    }

    let (address, phone) = match &session.flow_data {
        FlowData::Order(draft) => (draft.address.clone(), draft.phone.clone()),
        _ => (None, None),
    };

    let conn = get_connection(&deps.db_pool)?;
    let order_id = catalog::create_order(
        &conn,
        tenant.0,
        customer_id,
        &items,
        address.as_deref(),
        phone.as_deref(),
    )?;

    save_cart(session, &[])?;
    session.reset_to_menu();
    log::info!("Order {} placed in shop {} by {}", order_id, tenant, customer_id);

    let mut args = FluentArgs::new();
    args.set("order", order_id);
    Ok(respond(msg, chat_id, i18n::t_args(&lang, "checkout.done", &args)))
}

pub(super) fn cancel_checkout(msg: &InboundMessage, session: &mut Session) -> AppResult<OutboundResponse> {
    let chat_id = chat_of(msg)?;
    let lang = lang_of(session);
    session.reset_to_menu();
    Ok(respond(msg, chat_id, i18n::t(&lang, "checkout.cancelled")))
}

pub struct CheckoutFlow;

#[async_trait]
impl FlowHandler for CheckoutFlow {
    fn name(&self) -> &'static str {
        "checkout_flow"
    }

    fn owns(&self, state: &SessionState) -> bool {
        matches!(state, SessionState::Order(_))
    }

    async fn handle(
        &self,
        msg: &InboundMessage,
        session: &mut Session,
        deps: &HandlerDeps,
    ) -> AppResult<OutboundResponse> {
        let chat_id = chat_of(msg)?;
        let lang = lang_of(session);
        let SessionState::Order(step) = session.state else {
            return Err(AppError::Validation("checkout flow outside its state".into()));
        };

        let Some(text) = text_of(msg) else {
            let key = match step {
                OrderStep::Address => "checkout.ask-address",
                OrderStep::Phone => "checkout.ask-phone",
                OrderStep::Confirm => "checkout.confirm-hint",
            };
            return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, key)));
        };

        match step {
            OrderStep::Address => {
                if let Some(draft) = session.flow_data.as_order_mut() {
                    draft.address = Some(text.to_string());
                }
                session.state = SessionState::Order(OrderStep::Phone);
                Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "checkout.ask-phone")))
            }
            OrderStep::Phone => {
                if !is_valid_phone(text) {
                    return Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "checkout.invalid-phone")));
                }
                if let Some(draft) = session.flow_data.as_order_mut() {
                    draft.phone = Some(text.to_string());
                }
                session.state = SessionState::Order(OrderStep::Confirm);

                let items = cart_items(session);
                let mut args = FluentArgs::new();
                args.set("total", format_price(cart_total_cents(&items)));
                Ok(OutboundResponse::text(chat_id, i18n::t_args(&lang, "checkout.confirm", &args))
                    .with_buttons(confirm_buttons(&lang, "cart:confirm", "cart:cancel")))
            }
            OrderStep::Confirm => match confirm_answer(text) {
                Some(true) => finalize_checkout(msg, session, deps),
                Some(false) => cancel_checkout(msg, session),
                None => Ok(OutboundResponse::text(chat_id, i18n::t(&lang, "checkout.confirm-hint"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_validation_accepts_common_shapes() {
        assert!(is_valid_phone("+7 999 000-11-22"));
        assert!(is_valid_phone("89990001122"));
        assert!(!is_valid_phone("not a phone"));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("123"));
    }

    #[test]
    fn email_validation_is_shallow_but_sane() {
        assert!(is_valid_email("anna@example.com"));
        assert!(!is_valid_email("anna.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("anna@com"));
    }

    #[test]
    fn bot_token_shape() {
        assert!(looks_like_bot_token("123456789:AAFakeSecretPart"));
        assert!(!looks_like_bot_token("no-colon-here"));
        assert!(!looks_like_bot_token("abc:AAFakeSecretPart"));
        assert!(!looks_like_bot_token("123:short"));
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price_cents("25"), Some(2500));
        assert_eq!(parse_price_cents("25.5"), Some(2550));
        assert_eq!(parse_price_cents("25.50"), Some(2550));
        assert_eq!(parse_price_cents("25,50"), Some(2550));
        assert_eq!(parse_price_cents("0"), None);
        assert_eq!(parse_price_cents("25.505"), None);
        assert_eq!(parse_price_cents("abc"), None);
    }

    #[test]
    fn confirm_answers() {
        assert_eq!(confirm_answer("Yes"), Some(true));
        assert_eq!(confirm_answer("да"), Some(true));
        assert_eq!(confirm_answer("NO"), Some(false));
        assert_eq!(confirm_answer("maybe"), None);
    }
}
