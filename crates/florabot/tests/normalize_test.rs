//! Normalization laws: classification order, command parsing, and the
//! failure mode for events we cannot route.

mod common;

use common::fixtures::*;
use pretty_assertions::assert_eq;

use florabot::telegram::{normalize, MessageKind};
use floracore::types::TenantId;

#[test]
fn command_with_args_parses_token_and_args() {
    let update = message_update(5, 5, "/setplan premium 30");
    let msg = normalize(&update, None);

    assert_eq!(msg.kind, MessageKind::Command);
    assert_eq!(msg.command.as_deref(), Some("setplan"));
    assert_eq!(msg.command_args, vec!["premium".to_string(), "30".to_string()]);
    assert_eq!(msg.raw_text.as_deref(), Some("/setplan premium 30"));
    assert_eq!(msg.chat_id, Some(5));
    assert_eq!(msg.user_id, Some(5));
}

#[test]
fn command_without_args_has_empty_args_array() {
    let msg = normalize(&message_update(5, 5, "/catalog"), None);

    assert_eq!(msg.kind, MessageKind::Command);
    assert_eq!(msg.command.as_deref(), Some("catalog"));
    assert!(msg.command_args.is_empty());
}

#[test]
fn command_token_case_is_preserved() {
    let msg = normalize(&message_update(5, 5, "/Start"), None);
    assert_eq!(msg.command.as_deref(), Some("Start"));
}

#[test]
fn plain_text_is_text_kind_with_no_command_fields() {
    let msg = normalize(&message_update(5, 5, "red roses"), None);

    assert_eq!(msg.kind, MessageKind::Text);
    assert_eq!(msg.command, None);
    assert_eq!(msg.callback_data, None);
    assert_eq!(msg.web_app_payload, None);
}

#[test]
fn webapp_payload_wins_and_is_idempotent() {
    let payload = serde_json::json!({ "type": "order", "items": [] });
    let update = webapp_update(5, 5, &payload);

    let first = normalize(&update, Some(TenantId(1)));
    assert_eq!(first.kind, MessageKind::WebAppData);
    assert_eq!(first.command, None);
    assert_eq!(first.callback_data, None);
    assert_eq!(
        first.web_app_payload.as_deref(),
        Some(payload.to_string().as_str())
    );

    // Normalizing the same raw event again yields the same message.
    let second = normalize(&update, Some(TenantId(1)));
    assert_eq!(second, first);
}

#[test]
fn media_kinds_classify_by_attachment() {
    assert_eq!(normalize(&photo_update(5, 5), None).kind, MessageKind::Photo);
    assert_eq!(normalize(&document_update(5, 5), None).kind, MessageKind::Document);
    assert_eq!(normalize(&location_update(5, 5), None).kind, MessageKind::Location);
    assert_eq!(normalize(&contact_update(5, 5), None).kind, MessageKind::Contact);
    assert_eq!(normalize(&voice_update(5, 5), None).kind, MessageKind::Voice);
}

#[test]
fn callback_takes_chat_from_attached_message() {
    let msg = normalize(&callback_update(5, 6, "order:cancel:123"), Some(TenantId(2)));

    assert_eq!(msg.kind, MessageKind::CallbackQuery);
    assert_eq!(msg.callback_data.as_deref(), Some("order:cancel:123"));
    assert_eq!(msg.chat_id, Some(5));
    assert_eq!(msg.user_id, Some(6));
    assert_eq!(msg.message_id, Some(55));
    assert!(msg.callback_id.is_some());
}

#[test]
fn callback_without_message_has_no_chat() {
    let msg = normalize(&callback_update_without_message(6, "order:1"), None);

    assert_eq!(msg.kind, MessageKind::CallbackQuery);
    assert_eq!(msg.chat_id, None);
    assert!(!msg.routable());
}

#[test]
fn unhandled_update_kind_normalizes_to_unknown_without_chat() {
    let msg = normalize(&edited_message_update(5, 5), None);

    assert_eq!(msg.kind, MessageKind::Unknown);
    assert_eq!(msg.chat_id, None);
    assert_eq!(msg.user_id, None);
    assert!(!msg.routable());
}

#[test]
fn tenant_id_is_stamped_onto_the_message() {
    let msg = normalize(&message_update(5, 5, "hi"), Some(TenantId(7)));
    assert_eq!(msg.tenant_id, Some(TenantId(7)));

    let admin_msg = normalize(&message_update(5, 5, "hi"), None);
    assert_eq!(admin_msg.tenant_id, None);
}

#[test]
fn provider_metadata_lands_in_the_bag() {
    let msg = normalize(&message_update(5, 5, "hi"), None);
    assert_eq!(msg.metadata.get("first_name").map(String::as_str), Some("Test"));
    assert_eq!(msg.language_code(), Some("en"));
}
