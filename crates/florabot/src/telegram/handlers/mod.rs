//! Handler contracts and per-bot handler registries.
//!
//! Handlers are pure with respect to dispatch infrastructure: they receive
//! the normalized message, the user's session, and their dependencies, mutate
//! the session in place, and return an [`OutboundResponse`]. They never touch
//! the tenant context, the bot registry, or session locking; the dispatcher
//! owns persistence and delivery.
//!
//! Registries are built once at process initialization from plain
//! registration calls; callback and webapp registration order is preserved
//! and meaningful (first registered match wins).

pub mod admin;
pub mod flows;
pub mod tenant;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use floracore::error::AppResult;
use floracore::session::{Session, SessionState};
use floracore::storage::DbPool;

use super::response::OutboundResponse;
use super::update::InboundMessage;

/// Dependencies injected into every handler invocation.
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
}

impl HandlerDeps {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }
}

/// Handles one named slash command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Command token this handler answers to, without the slash. Matching is
    /// verbatim (command tokens are not case-normalized).
    fn command(&self) -> &'static str;

    /// Commands gated behind the handler set's authentication predicate.
    fn requires_auth(&self) -> bool {
        false
    }

    async fn handle(&self, msg: &InboundMessage, session: &mut Session, deps: &HandlerDeps)
        -> AppResult<OutboundResponse>;
}

/// Handles callback queries whose data starts with a fixed prefix.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    fn prefix(&self) -> &'static str;

    async fn handle(&self, msg: &InboundMessage, session: &mut Session, deps: &HandlerDeps)
        -> AppResult<OutboundResponse>;
}

/// Drives a multi-turn flow; owns one or more session states and mutates the
/// session to transition between them.
#[async_trait]
pub trait FlowHandler: Send + Sync {
    /// Stable identity for logs.
    fn name(&self) -> &'static str;

    fn owns(&self, state: &SessionState) -> bool;

    async fn handle(&self, msg: &InboundMessage, session: &mut Session, deps: &HandlerDeps)
        -> AppResult<OutboundResponse>;
}

/// Handles structured webform submissions from the embedded mini-app.
#[async_trait]
pub trait WebAppHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, msg: &InboundMessage) -> bool;

    async fn handle(&self, msg: &InboundMessage, session: &mut Session, deps: &HandlerDeps)
        -> AppResult<OutboundResponse>;
}

/// Per-bot default handler for plain text that no flow claimed.
#[async_trait]
pub trait TextHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, msg: &InboundMessage, session: &mut Session, deps: &HandlerDeps)
        -> AppResult<OutboundResponse>;
}

/// Authentication predicate evaluated against the session before a gated
/// command handler runs.
pub type AuthPredicate = Arc<dyn Fn(&Session) -> bool + Send + Sync>;

/// One bot type's complete set of handlers.
pub struct HandlerSet {
    commands: HashMap<&'static str, Arc<dyn CommandHandler>>,
    callbacks: Vec<Arc<dyn CallbackHandler>>,
    webapps: Vec<Arc<dyn WebAppHandler>>,
    flows: Vec<Arc<dyn FlowHandler>>,
    text: Option<Arc<dyn TextHandler>>,
    auth: AuthPredicate,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            callbacks: Vec::new(),
            webapps: Vec::new(),
            flows: Vec::new(),
            text: None,
            auth: Arc::new(|_| true),
        }
    }

    pub fn set_auth_predicate(&mut self, auth: AuthPredicate) {
        self.auth = auth;
    }

    pub fn register_command(&mut self, handler: Arc<dyn CommandHandler>) {
        let command = handler.command();
        if self.commands.insert(command, handler).is_some() {
            log::warn!("Command handler for /{} registered twice; keeping the last", command);
        }
    }

    pub fn register_callback(&mut self, handler: Arc<dyn CallbackHandler>) {
        self.callbacks.push(handler);
    }

    pub fn register_webapp(&mut self, handler: Arc<dyn WebAppHandler>) {
        self.webapps.push(handler);
    }

    pub fn register_flow(&mut self, handler: Arc<dyn FlowHandler>) {
        self.flows.push(handler);
    }

    pub fn set_text_handler(&mut self, handler: Arc<dyn TextHandler>) {
        self.text = Some(handler);
    }

    pub fn command(&self, name: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.commands.get(name)
    }

    /// First registered handler whose prefix is a string-prefix of `data`.
    ///
    /// Registration-order dependent by design (compatibility behavior); with
    /// overlapping prefixes the earlier registration wins.
    pub fn callback_for(&self, data: &str) -> Option<&Arc<dyn CallbackHandler>> {
        self.callbacks.iter().find(|handler| data.starts_with(handler.prefix()))
    }

    /// First registered webapp handler that claims the message.
    pub fn webapp_for(&self, msg: &InboundMessage) -> Option<&Arc<dyn WebAppHandler>> {
        self.webapps.iter().find(|handler| handler.can_handle(msg))
    }

    pub fn flow_for(&self, state: &SessionState) -> Option<&Arc<dyn FlowHandler>> {
        self.flows.iter().find(|handler| handler.owns(state))
    }

    pub fn text_handler(&self) -> Option<&Arc<dyn TextHandler>> {
        self.text.as_ref()
    }

    pub fn is_authenticated(&self, session: &Session) -> bool {
        (self.auth)(session)
    }
}

impl Default for HandlerSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Session attribute set once the owner finished registration; the admin
/// set's authentication predicate keys off it.
pub const ATTR_OWNER_REGISTERED: &str = "owner_registered";

/// Session attribute holding the serialized cart on tenant bots.
pub const ATTR_CART: &str = "cart";

/// Session attribute for the owner's order-notification preference ("on"/"off").
pub const ATTR_NOTIFICATIONS: &str = "notifications";

/// Builds the admin bot's handler set.
pub fn admin_handler_set() -> HandlerSet {
    let mut set = HandlerSet::new();
    set.set_auth_predicate(Arc::new(|session: &Session| {
        session.attributes.get(ATTR_OWNER_REGISTERED).map(String::as_str) == Some("true")
    }));

    set.register_command(Arc::new(admin::StartCommand));
    set.register_command(Arc::new(admin::RegisterCommand));
    set.register_command(Arc::new(admin::MyShopsCommand));
    set.register_command(Arc::new(admin::NewShopCommand));
    set.register_command(Arc::new(admin::CancelCommand));
    set.register_command(Arc::new(admin::SettingsCommand));
    set.register_command(Arc::new(admin::LanguageCommand));

    set.register_callback(Arc::new(admin::RegistrationCallback));
    set.register_callback(Arc::new(admin::ShopSetupCallback));
    set.register_callback(Arc::new(admin::ShopCallback));
    set.register_callback(Arc::new(admin::ProductCallback));
    set.register_callback(Arc::new(admin::CategoryCallback));
    set.register_callback(Arc::new(admin::SettingsCallback));
    set.register_callback(Arc::new(admin::LanguageCallback));

    set.register_webapp(Arc::new(admin::ShopSetupWebApp));

    set.register_flow(Arc::new(flows::RegistrationFlow));
    set.register_flow(Arc::new(flows::ShopSetupFlow));
    set.register_flow(Arc::new(flows::ShopEditFlow));
    set.register_flow(Arc::new(flows::ProductFlow));
    set.register_flow(Arc::new(flows::CategoryFlow));
    set.register_flow(Arc::new(flows::SettingsFlow));

    set.set_text_handler(Arc::new(admin::AdminTextHandler));
    set
}

/// Builds the handler set shared by every tenant (shop) bot.
pub fn tenant_handler_set() -> HandlerSet {
    let mut set = HandlerSet::new();

    set.register_command(Arc::new(tenant::StartCommand));
    set.register_command(Arc::new(tenant::CatalogCommand));
    set.register_command(Arc::new(tenant::CartCommand));
    set.register_command(Arc::new(tenant::OrdersCommand));
    set.register_command(Arc::new(tenant::CancelCommand));

    set.register_callback(Arc::new(tenant::CategoryCallback));
    set.register_callback(Arc::new(tenant::ProductCallback));
    // First registered match wins and these prefixes overlap: `order:cancel:`
    // must stay registered before `order:` or it becomes unreachable.
    set.register_callback(Arc::new(tenant::OrderCancelCallback));
    set.register_callback(Arc::new(tenant::OrderCallback));
    set.register_callback(Arc::new(tenant::CartCallback));

    set.register_webapp(Arc::new(tenant::OrderWebApp));

    set.register_flow(Arc::new(flows::CheckoutFlow));

    set.set_text_handler(Arc::new(tenant::CatalogSearchHandler));
    set
}
