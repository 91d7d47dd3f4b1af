//! Telegram surface: normalization, routing, dispatch, delivery

pub mod dispatch;
pub mod handlers;
pub mod outbound;
pub mod processor;
pub mod registry;
pub mod response;
pub mod update;
pub mod webhook;

// Re-exports for convenience
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use handlers::{admin_handler_set, tenant_handler_set, HandlerDeps, HandlerSet};
pub use processor::Processor;
pub use registry::{BotDirectory, BotRegistry, SqliteBotDirectory};
pub use response::{OutboundAction, OutboundResponse};
pub use update::{normalize, InboundMessage, MessageKind};
