//! Florabot - multi-tenant Telegram bot platform for flower shops
//!
//! One admin bot through which shop owners register and configure their
//! storefronts, and one bot identity per active shop serving end customers.
//! This crate holds the bot surface: update normalization, tenant/bot
//! resolution, the per-user session dispatcher, handler sets, and outbound
//! delivery. Everything below the Telegram layer lives in `floracore`.
//!
//! # Module Structure
//!
//! - `telegram`: normalization, registry, dispatch, handlers, transport
//! - `metrics`: Prometheus counters
//! - `cli`: command-line entry points

pub mod cli;
pub mod metrics;
pub mod telegram;

// Re-export commonly used types for convenience
pub use telegram::{
    admin_handler_set, normalize, tenant_handler_set, BotRegistry, DispatchOutcome, Dispatcher, HandlerDeps,
    InboundMessage, MessageKind, OutboundAction, OutboundResponse, Processor, SqliteBotDirectory,
};
