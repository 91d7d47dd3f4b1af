//! The unit of work for one inbound update.
//!
//! Everything a turn needs happens here, in order: tenant context scope,
//! normalization, the per-session lock, session load-or-create, dispatch,
//! save-on-success, and the callback auto-answer. The transport gets back
//! zero or one response to deliver.
//!
//! A session-store failure is fatal for the turn and propagates; no reply is
//! attempted, since there is no session context to build one safely. The
//! per-key lock guard is released on every exit path, including timeout
//! cancellation in the webhook layer.

use std::sync::Arc;

use teloxide::types::Update;

use floracore::context;
use floracore::error::AppResult;
use floracore::i18n;
use floracore::session::{SessionKey, SessionLocks, SessionState, SessionStore};
use floracore::types::{BotIdentity, BotKind};

use super::dispatch::Dispatcher;
use super::handlers::{admin_handler_set, tenant_handler_set, HandlerDeps};
use super::response::{OutboundAction, OutboundResponse};
use super::update::{normalize, MessageKind};
use crate::metrics;

/// Session attribute marking that the locale has been resolved once from the
/// provider profile; later turns respect the user's explicit choice.
const ATTR_LANG_RESOLVED: &str = "lang_resolved";

pub struct Processor {
    sessions: Arc<dyn SessionStore>,
    locks: Arc<SessionLocks>,
    deps: HandlerDeps,
    admin: Dispatcher,
    tenant: Dispatcher,
}

impl Processor {
    /// Processor with the production handler sets.
    pub fn new(sessions: Arc<dyn SessionStore>, locks: Arc<SessionLocks>, deps: HandlerDeps) -> Self {
        Self::with_dispatchers(
            sessions,
            locks,
            deps,
            Dispatcher::new(admin_handler_set()),
            Dispatcher::new(tenant_handler_set()),
        )
    }

    /// Processor with injected dispatchers (used by tests).
    pub fn with_dispatchers(
        sessions: Arc<dyn SessionStore>,
        locks: Arc<SessionLocks>,
        deps: HandlerDeps,
        admin: Dispatcher,
        tenant: Dispatcher,
    ) -> Self {
        Self {
            sessions,
            locks,
            deps,
            admin,
            tenant,
        }
    }

    /// Runs one update through normalization, dispatch, and persistence.
    ///
    /// Returns the response for the transport to deliver, or `None` when the
    /// turn produced nothing to send.
    pub async fn process(&self, identity: &BotIdentity, update: &Update) -> AppResult<Option<OutboundResponse>> {
        context::scope(identity.tenant_id, self.process_inner(identity, update)).await
    }

    async fn process_inner(&self, identity: &BotIdentity, update: &Update) -> AppResult<Option<OutboundResponse>> {
        let kind_label = identity.kind.to_string();
        metrics::UPDATES_TOTAL.with_label_values(&[kind_label.as_str()]).inc();

        let msg = normalize(update, identity.tenant_id);
        if !msg.routable() {
            // Normalization failure: nothing to address a reply to.
            log::info!(
                "Dropping unroutable {} update (tenant={})",
                msg.kind,
                context::log_label()
            );
            return Ok(None);
        }

        let key = SessionKey::new(identity.tenant_id, msg.user_id.unwrap_or_default());
        let _turn = self.locks.acquire(&key).await;

        let mut session = self.sessions.get_or_create(&key).await?;

        // First contact: adopt the provider-supplied locale if we support it.
        if session.state == SessionState::New && !session.attributes.contains_key(ATTR_LANG_RESOLVED) {
            if let Some(code) = msg.language_code().and_then(i18n::is_language_supported) {
                session.language = code.to_string();
            }
            session.attributes.insert(ATTR_LANG_RESOLVED.to_string(), "true".to_string());
        }

        let dispatcher = match identity.kind {
            BotKind::Admin => &self.admin,
            BotKind::Tenant | BotKind::Driver => &self.tenant,
        };

        let outcome = dispatcher.dispatch(&msg, &mut session, &self.deps).await;
        if outcome.persist_session() {
            self.sessions.save(&session).await?;
        } else {
            // Failed turn: the session is discarded at its pre-turn state.
            metrics::DISPATCH_FAILURES_TOTAL.inc();
        }

        let mut response = outcome.into_response();
        if msg.kind == MessageKind::CallbackQuery {
            // Always dismiss the Telegram button spinner, after the primary.
            if let (Some(resp), Some(callback_id)) = (response.take(), msg.callback_id.clone()) {
                response = Some(resp.add_action(OutboundAction::AnswerCallback { callback_id }));
            }
        }
        Ok(response)
    }
}
