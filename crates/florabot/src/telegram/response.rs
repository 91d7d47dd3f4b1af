//! Canonical outbound responses.
//!
//! Handlers return data, not side effects: one primary send/edit directive
//! plus zero or more auxiliary directives. The transport delivers the primary
//! action first; auxiliary actions run afterwards, best-effort and
//! independently failable. An auxiliary failure never rolls back or retries
//! the primary.

/// One row of inline-keyboard buttons: (label, callback data).
pub type ButtonRow = Vec<(String, String)>;

/// A single outbound directive for the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundAction {
    SendText {
        chat_id: i64,
        text: String,
        buttons: Vec<ButtonRow>,
    },
    EditText {
        chat_id: i64,
        message_id: i32,
        text: String,
        buttons: Vec<ButtonRow>,
    },
    AnswerCallback {
        callback_id: String,
    },
    DeleteMessage {
        chat_id: i64,
        message_id: i32,
    },
}

/// A handler's complete answer for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundResponse {
    pub primary: OutboundAction,
    pub auxiliary: Vec<OutboundAction>,
}

impl OutboundResponse {
    /// Plain text reply to a chat.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            primary: OutboundAction::SendText {
                chat_id,
                text: text.into(),
                buttons: Vec::new(),
            },
            auxiliary: Vec::new(),
        }
    }

    /// Edit of an existing message (callback turns).
    pub fn edit_text(chat_id: i64, message_id: i32, text: impl Into<String>) -> Self {
        Self {
            primary: OutboundAction::EditText {
                chat_id,
                message_id,
                text: text.into(),
                buttons: Vec::new(),
            },
            auxiliary: Vec::new(),
        }
    }

    /// Attaches inline-keyboard rows to the primary action. No-op for
    /// actions that cannot carry a keyboard.
    pub fn with_buttons(mut self, rows: Vec<ButtonRow>) -> Self {
        match &mut self.primary {
            OutboundAction::SendText { buttons, .. } | OutboundAction::EditText { buttons, .. } => *buttons = rows,
            _ => {}
        }
        self
    }

    /// Appends an auxiliary action, preserving order.
    pub fn add_action(mut self, action: OutboundAction) -> Self {
        self.auxiliary.push(action);
        self
    }

    /// Chat the primary action targets, when it has one.
    pub fn chat_id(&self) -> Option<i64> {
        match &self.primary {
            OutboundAction::SendText { chat_id, .. }
            | OutboundAction::EditText { chat_id, .. }
            | OutboundAction::DeleteMessage { chat_id, .. } => Some(*chat_id),
            OutboundAction::AnswerCallback { .. } => None,
        }
    }

    /// Text of the primary action, when it has one. Used by tests and logs.
    pub fn primary_text(&self) -> Option<&str> {
        match &self.primary {
            OutboundAction::SendText { text, .. } | OutboundAction::EditText { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_start_with_no_auxiliaries() {
        let response = OutboundResponse::text(1, "hi");
        assert!(response.auxiliary.is_empty());
        assert_eq!(response.chat_id(), Some(1));
        assert_eq!(response.primary_text(), Some("hi"));

        let edited = OutboundResponse::edit_text(1, 7, "hi");
        assert!(edited.auxiliary.is_empty());
    }

    #[test]
    fn add_action_preserves_order() {
        let response = OutboundResponse::text(1, "hi")
            .add_action(OutboundAction::AnswerCallback {
                callback_id: "a".into(),
            })
            .add_action(OutboundAction::DeleteMessage {
                chat_id: 1,
                message_id: 2,
            });

        assert_eq!(response.auxiliary.len(), 2);
        assert!(matches!(response.auxiliary[0], OutboundAction::AnswerCallback { .. }));
        assert!(matches!(response.auxiliary[1], OutboundAction::DeleteMessage { .. }));
    }

    #[test]
    fn buttons_attach_to_the_primary() {
        let response = OutboundResponse::text(1, "menu")
            .with_buttons(vec![vec![("Catalog".to_string(), "cat:list".to_string())]]);
        match response.primary {
            OutboundAction::SendText { ref buttons, .. } => assert_eq!(buttons.len(), 1),
            _ => panic!("expected SendText"),
        }
    }
}
