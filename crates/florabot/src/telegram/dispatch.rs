//! Router/dispatcher: picks exactly one handler per inbound message.
//!
//! The priority order below is the core behavioral contract (first
//! applicable rule wins):
//!
//! 1. registered command (gated by the set's authentication predicate)
//! 2. callback query, first registered prefix match
//! 3. webapp data, first registered `can_handle` match
//! 4. flow handler owning the current session state
//! 5. default text handler
//! 6. terminal: fixed "unknown command" copy for unregistered commands,
//!    otherwise a logged no-op
//!
//! Handler faults (error returns and panics alike) are caught here, logged
//! with tenant/user/handler identity, and converted into a fixed neutral
//! reply. The outcome tells the caller whether session mutations may be
//! persisted: a failed turn is discarded so partially-mutated state never
//! leaks forward.

use fluent_templates::fluent_bundle::FluentArgs;
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use floracore::context;
use floracore::error::AppResult;
use floracore::i18n;
use floracore::session::Session;

use super::handlers::{HandlerDeps, HandlerSet};
use super::response::OutboundResponse;
use super::update::{InboundMessage, MessageKind};

/// What one dispatch turn produced.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Handler completed; persist the session and deliver the response.
    Handled(OutboundResponse),
    /// Nothing to send; still counts as activity, so persist the session.
    NoReply,
    /// Handler fault; deliver the fixed error reply and DISCARD the session.
    Failed(OutboundResponse),
    /// Handler fault with no chat to answer; discard the session, log only.
    FailedSilently,
}

impl DispatchOutcome {
    /// Whether the turn's session mutations may be saved.
    pub fn persist_session(&self) -> bool {
        matches!(self, DispatchOutcome::Handled(_) | DispatchOutcome::NoReply)
    }

    pub fn into_response(self) -> Option<OutboundResponse> {
        match self {
            DispatchOutcome::Handled(response) | DispatchOutcome::Failed(response) => Some(response),
            DispatchOutcome::NoReply | DispatchOutcome::FailedSilently => None,
        }
    }
}

/// Dispatcher over one bot type's handler set.
pub struct Dispatcher {
    set: HandlerSet,
}

impl Dispatcher {
    pub fn new(set: HandlerSet) -> Self {
        Self { set }
    }

    pub fn handler_set(&self) -> &HandlerSet {
        &self.set
    }

    /// Runs the dispatch algorithm for one normalized message.
    pub async fn dispatch(&self, msg: &InboundMessage, session: &mut Session, deps: &HandlerDeps) -> DispatchOutcome {
        let lang = i18n::lang_from_code(&session.language);

        // Rule 1: registered command, behind the auth gate.
        if msg.kind == MessageKind::Command {
            if let Some(command) = msg.command.as_deref() {
                if let Some(handler) = self.set.command(command) {
                    if handler.requires_auth() && !self.set.is_authenticated(session) {
                        log::info!(
                            "Auth required for /{} (tenant={}, user={:?})",
                            command,
                            context::log_label(),
                            msg.user_id
                        );
                        return reply_or_silent(msg, i18n::t(&lang, "dispatch.auth-required"));
                    }
                    let name = handler.command();
                    return guarded(handler.handle(msg, session, deps), name, msg, &lang).await;
                }
            }
        }

        // Rule 2: callback query, first registered prefix match.
        if msg.kind == MessageKind::CallbackQuery {
            let data = msg.callback_data.as_deref().unwrap_or("");
            if let Some(handler) = self.set.callback_for(data) {
                let name = handler.prefix();
                return guarded(handler.handle(msg, session, deps), name, msg, &lang).await;
            }
            log::warn!(
                "No callback handler for {:?} (tenant={}, user={:?})",
                data,
                context::log_label(),
                msg.user_id
            );
            return reply_or_silent(msg, i18n::t(&lang, "dispatch.unknown-callback"));
        }

        // Rule 3: webapp payload, first registered claim.
        if msg.kind == MessageKind::WebAppData {
            if let Some(handler) = self.set.webapp_for(msg) {
                let name = handler.name();
                return guarded(handler.handle(msg, session, deps), name, msg, &lang).await;
            }
            log::warn!(
                "No webapp handler claimed payload (tenant={}, user={:?})",
                context::log_label(),
                msg.user_id
            );
            return reply_or_silent(msg, i18n::t(&lang, "dispatch.unknown-webapp"));
        }

        // Rule 4: the flow owning the current state gets the full update,
        // unregistered commands and media included, since a flow may branch
        // on message shape itself.
        if let Some(handler) = self.set.flow_for(&session.state) {
            let name = handler.name();
            return guarded(handler.handle(msg, session, deps), name, msg, &lang).await;
        }

        // Rule 5: default text handler.
        if msg.kind == MessageKind::Text {
            if let Some(handler) = self.set.text_handler() {
                let name = handler.name();
                return guarded(handler.handle(msg, session, deps), name, msg, &lang).await;
            }
        }

        // Rule 6: terminal. An unregistered command outside any flow gets the
        // fixed reply; everything else is a logged no-op.
        if msg.kind == MessageKind::Command {
            if let Some(command) = msg.command.as_deref() {
                let mut args = FluentArgs::new();
                args.set("command", command);
                return reply_or_silent(msg, i18n::t_args(&lang, "dispatch.unknown-command", &args));
            }
        }

        log::debug!(
            "No handler for {} message (tenant={}, user={:?})",
            msg.kind,
            context::log_label(),
            msg.user_id
        );
        DispatchOutcome::NoReply
    }
}

/// Builds a reply when the originating chat is known, otherwise goes silent.
fn reply_or_silent(msg: &InboundMessage, text: String) -> DispatchOutcome {
    match msg.chat_id {
        Some(chat_id) => match msg.message_id.filter(|_| msg.kind == MessageKind::CallbackQuery) {
            Some(message_id) => DispatchOutcome::Handled(OutboundResponse::edit_text(chat_id, message_id, text)),
            None => DispatchOutcome::Handled(OutboundResponse::text(chat_id, text)),
        },
        None => DispatchOutcome::NoReply,
    }
}

/// Runs a handler future behind the dispatch error boundary.
///
/// Both error returns and panics terminate the turn: the session is not
/// persisted past its pre-turn state, and the user gets the fixed neutral
/// reply if the originating chat is known.
async fn guarded<F>(fut: F, handler: &str, msg: &InboundMessage, lang: &i18n::LanguageIdentifier) -> DispatchOutcome
where
    F: Future<Output = AppResult<OutboundResponse>>,
{
    let outcome = AssertUnwindSafe(fut).catch_unwind().await;

    let fault = match outcome {
        Ok(Ok(response)) => return DispatchOutcome::Handled(response),
        Ok(Err(e)) => format!("{e}"),
        Err(panic) => {
            let payload = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            format!("panic: {payload}")
        }
    };

    log::error!(
        "Handler {} failed (tenant={}, user={:?}): {}",
        handler,
        context::log_label(),
        msg.user_id,
        fault
    );

    match msg.chat_id {
        Some(chat_id) => DispatchOutcome::Failed(OutboundResponse::text(chat_id, i18n::t(lang, "dispatch.handler-error"))),
        None => DispatchOutcome::FailedSilently,
    }
}
