//! Outbound delivery: turns an [`OutboundResponse`] into Telegram API calls.
//!
//! The primary action must succeed (its error fails the delivery); auxiliary
//! actions run afterwards best-effort: each failure is logged and skipped,
//! never rolled back or retried.

use dashmap::DashMap;
use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use teloxide::Bot;

use floracore::config;
use floracore::error::{AppError, AppResult};
use floracore::types::BotKind;

use super::response::{ButtonRow, OutboundAction, OutboundResponse};
use crate::metrics;

/// One teloxide `Bot` per token, all sharing a single HTTP client.
pub struct BotPool {
    client: reqwest::Client,
    bots: DashMap<String, Bot>,
}

impl BotPool {
    pub fn new() -> AppResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config::network::timeout())
            .build()
            .map_err(|e| AppError::Validation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            bots: DashMap::new(),
        })
    }

    pub fn get(&self, token: &str) -> Bot {
        self.bots
            .entry(token.to_string())
            .or_insert_with(|| Bot::with_client(token, self.client.clone()))
            .clone()
    }
}

fn keyboard(rows: &[ButtonRow]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|(label, data)| InlineKeyboardButton::callback(label.clone(), data.clone()))
            .collect::<Vec<_>>()
    }))
}

async fn execute(bot: &Bot, action: &OutboundAction) -> Result<(), teloxide::RequestError> {
    match action {
        OutboundAction::SendText { chat_id, text, buttons } => {
            let request = bot.send_message(ChatId(*chat_id), text.clone());
            if buttons.is_empty() {
                request.await?;
            } else {
                request.reply_markup(keyboard(buttons)).await?;
            }
        }
        OutboundAction::EditText {
            chat_id,
            message_id,
            text,
            buttons,
        } => {
            let request = bot.edit_message_text(ChatId(*chat_id), MessageId(*message_id), text.clone());
            if buttons.is_empty() {
                request.await?;
            } else {
                request.reply_markup(keyboard(buttons)).await?;
            }
        }
        OutboundAction::AnswerCallback { callback_id } => {
            bot.answer_callback_query(CallbackQueryId(callback_id.clone())).await?;
        }
        OutboundAction::DeleteMessage { chat_id, message_id } => {
            bot.delete_message(ChatId(*chat_id), MessageId(*message_id)).await?;
        }
    }
    Ok(())
}

/// Delivers one response: primary with `?`, auxiliaries best-effort.
pub async fn deliver(bot: &Bot, response: &OutboundResponse) -> AppResult<()> {
    if let Err(e) = execute(bot, &response.primary).await {
        metrics::DELIVERY_FAILURES_TOTAL.inc();
        return Err(e.into());
    }

    for action in &response.auxiliary {
        if let Err(e) = execute(bot, action).await {
            log::warn!("Auxiliary action failed (ignored): {}", e);
        }
    }
    Ok(())
}

/// Publishes the command list shown in the Telegram UI for a bot.
pub async fn setup_bot_commands(bot: &Bot, kind: BotKind) -> Result<(), teloxide::RequestError> {
    let commands = match kind {
        BotKind::Admin => vec![
            BotCommand::new("start", "what this bot can do"),
            BotCommand::new("register", "register as a shop owner"),
            BotCommand::new("myshops", "manage your shops"),
            BotCommand::new("newshop", "set up a new shop"),
            BotCommand::new("settings", "language and notifications"),
            BotCommand::new("language", "change language"),
            BotCommand::new("cancel", "abandon the current step"),
        ],
        BotKind::Tenant | BotKind::Driver => vec![
            BotCommand::new("start", "open the shop"),
            BotCommand::new("catalog", "browse the catalog"),
            BotCommand::new("cart", "view your cart"),
            BotCommand::new("orders", "your orders"),
            BotCommand::new("cancel", "abandon the current step"),
        ],
    };

    bot.set_my_commands(commands).await?;
    Ok(())
}
