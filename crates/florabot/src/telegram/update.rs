//! Update normalization: the adapter boundary between the provider's update
//! schema and the dispatch core.
//!
//! `normalize` is a pure function; it never fails. Events it cannot make
//! sense of come back as [`MessageKind::Unknown`] with no chat id, which the
//! dispatcher treats as "cannot respond, log only".

use std::collections::HashMap;

use strum::Display;
use teloxide::types::{Message, Update, UpdateKind};

use floracore::types::TenantId;

/// Classification of an inbound event. Closed set; exactly one per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    Command,
    Text,
    CallbackQuery,
    WebAppData,
    Photo,
    Document,
    Location,
    Contact,
    Sticker,
    Voice,
    Unknown,
}

/// Canonical inbound message, immutable once built.
///
/// At most one of `command`, `callback_data`, `web_app_payload` is populated,
/// and only the one matching `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub tenant_id: Option<TenantId>,
    pub chat_id: Option<i64>,
    pub user_id: Option<i64>,
    pub kind: MessageKind,
    pub raw_text: Option<String>,
    /// Token after `/`, kept verbatim (no case normalization), `@botname`
    /// suffix stripped
    pub command: Option<String>,
    /// Whitespace-split remainder; empty when the command has no arguments
    pub command_args: Vec<String>,
    pub callback_data: Option<String>,
    pub web_app_payload: Option<String>,
    /// Provider message id of the triggering message, when known
    pub message_id: Option<i32>,
    /// Callback query id for the answer path
    pub callback_id: Option<String>,
    /// Provider-specific extras: username, first_name, language_code
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    fn empty(tenant_id: Option<TenantId>) -> Self {
        Self {
            tenant_id,
            chat_id: None,
            user_id: None,
            kind: MessageKind::Unknown,
            raw_text: None,
            command: None,
            command_args: Vec::new(),
            callback_data: None,
            web_app_payload: None,
            message_id: None,
            callback_id: None,
            metadata: HashMap::new(),
        }
    }

    /// True when the message can be answered at all.
    pub fn routable(&self) -> bool {
        self.chat_id.is_some() && self.user_id.is_some()
    }

    /// Language code supplied by the provider, if any.
    pub fn language_code(&self) -> Option<&str> {
        self.metadata.get("language_code").map(String::as_str)
    }
}

/// Splits `/command arg1 arg2` into the verbatim token and its args.
///
/// The token keeps its case; a trailing `@botname` (group-chat syntax) is
/// stripped. Args are split on whitespace runs; no args yields an empty vec.
fn parse_command(text: &str) -> Option<(String, Vec<String>)> {
    let rest = text.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }

    // Token = substring up to (not including) the first whitespace run. A
    // leading space ("/ hello") therefore yields no token and no command.
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let token = rest[..end].split('@').next().unwrap_or("");
    if token.is_empty() {
        return None;
    }

    let args = rest[end..].split_whitespace().map(str::to_string).collect();
    Some((token.to_string(), args))
}

fn user_metadata(msg: &Message) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    if let Some(user) = &msg.from {
        if let Some(username) = &user.username {
            metadata.insert("username".to_string(), username.clone());
        }
        metadata.insert("first_name".to_string(), user.first_name.clone());
        if let Some(code) = &user.language_code {
            metadata.insert("language_code".to_string(), code.clone());
        }
    }
    metadata
}

fn normalize_message(msg: &Message, tenant_id: Option<TenantId>) -> InboundMessage {
    let mut out = InboundMessage::empty(tenant_id);
    out.chat_id = Some(msg.chat.id.0);
    out.user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok());
    out.message_id = Some(msg.id.0);
    out.raw_text = msg.text().map(str::to_string);
    out.metadata = user_metadata(msg);

    // Classification order is a compatibility contract: a WebApp payload wins
    // over everything else, including text that would otherwise be a command.
    if let Some(web_app) = msg.web_app_data() {
        out.kind = MessageKind::WebAppData;
        out.web_app_payload = Some(web_app.data.clone());
        return out;
    }

    if let Some(text) = msg.text() {
        if let Some((command, args)) = parse_command(text) {
            out.kind = MessageKind::Command;
            out.command = Some(command);
            out.command_args = args;
            return out;
        }
        out.kind = MessageKind::Text;
        return out;
    }

    out.kind = if msg.photo().is_some() {
        MessageKind::Photo
    } else if msg.document().is_some() {
        MessageKind::Document
    } else if msg.location().is_some() {
        MessageKind::Location
    } else if msg.contact().is_some() {
        MessageKind::Contact
    } else if msg.sticker().is_some() {
        MessageKind::Sticker
    } else if msg.voice().is_some() {
        MessageKind::Voice
    } else {
        MessageKind::Unknown
    };
    out
}

/// Converts a raw provider event into a canonical [`InboundMessage`].
pub fn normalize(update: &Update, tenant_id: Option<TenantId>) -> InboundMessage {
    match &update.kind {
        UpdateKind::Message(msg) => normalize_message(msg, tenant_id),
        UpdateKind::CallbackQuery(q) => {
            let mut out = InboundMessage::empty(tenant_id);
            out.kind = MessageKind::CallbackQuery;
            out.user_id = i64::try_from(q.from.id.0).ok();
            // Chat id comes from the callback's attached message when present.
            out.chat_id = q.message.as_ref().map(|m| m.chat().id.0);
            out.message_id = q.message.as_ref().map(|m| m.id().0);
            out.callback_data = q.data.clone();
            out.callback_id = Some(q.id.0.clone());
            if let Some(username) = &q.from.username {
                out.metadata.insert("username".to_string(), username.clone());
            }
            out.metadata.insert("first_name".to_string(), q.from.first_name.clone());
            if let Some(code) = &q.from.language_code {
                out.metadata.insert("language_code".to_string(), code.clone());
            }
            out
        }
        _ => InboundMessage::empty(tenant_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parsing_keeps_case_and_splits_args() {
        let (cmd, args) = parse_command("/Start now  please").unwrap();
        assert_eq!(cmd, "Start");
        assert_eq!(args, vec!["now".to_string(), "please".to_string()]);
    }

    #[test]
    fn command_without_args_has_empty_vec() {
        let (cmd, args) = parse_command("/catalog").unwrap();
        assert_eq!(cmd, "catalog");
        assert!(args.is_empty());
    }

    #[test]
    fn bot_mention_suffix_is_stripped() {
        let (cmd, args) = parse_command("/start@floragram_bot arg").unwrap();
        assert_eq!(cmd, "start");
        assert_eq!(args, vec!["arg".to_string()]);
    }

    #[test]
    fn bare_slash_is_not_a_command() {
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/ hello"), None);
        assert_eq!(parse_command("hello"), None);
    }
}
