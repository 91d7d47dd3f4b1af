//! Webhook transport: the axum app receiving provider updates.
//!
//! `POST /webhook/{token}` answers 200 immediately and processes the update
//! in a background task, because the provider retries slow webhooks: nothing
//! user-visible may block the response. Unknown routing keys and malformed
//! bodies are logged and acknowledged with an empty 200; they never crash the
//! dispatch loop.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use teloxide::types::Update;

use floracore::config;

use super::outbound::{self, BotPool};
use super::processor::Processor;
use super::registry::BotRegistry;
use crate::metrics;

pub struct AppState {
    pub registry: Arc<BotRegistry>,
    pub processor: Arc<Processor>,
    pub bots: Arc<BotPool>,
}

/// Builds the webhook router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook/{token}", post(handle_webhook))
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn metrics_text() -> String {
    metrics::gather()
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: String,
) -> StatusCode {
    // Routing failure: log, acknowledge, no reply.
    let Some(identity) = state.registry.resolve(&token).await else {
        metrics::ROUTING_MISSES_TOTAL.inc();
        log::warn!("Webhook hit for unknown or inactive routing key");
        return StatusCode::OK;
    };

    // Lenient parse: a body we don't understand (bad JSON included) is
    // acknowledged and dropped rather than bounced back for provider retries.
    let update: Update = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            log::warn!("Unparseable update for {} bot: {}", identity.kind, e);
            return StatusCode::OK;
        }
    };

    tokio::spawn(async move {
        let processed = tokio::time::timeout(
            config::network::process_timeout(),
            state.processor.process(&identity, &update),
        )
        .await;

        match processed {
            Err(_elapsed) => {
                // Abandoned turn; the per-session lock guard was dropped with
                // the cancelled future.
                log::warn!("Update processing timed out (bot kind {})", identity.kind);
            }
            Ok(Err(e)) => {
                log::error!("Update processing failed (bot kind {}): {}", identity.kind, e);
            }
            Ok(Ok(None)) => {}
            Ok(Ok(Some(response))) => {
                let bot = state.bots.get(&identity.token);
                if let Err(e) = outbound::deliver(&bot, &response).await {
                    log::error!("Delivery failed (bot kind {}): {}", identity.kind, e);
                }
            }
        }
    });

    StatusCode::OK
}
