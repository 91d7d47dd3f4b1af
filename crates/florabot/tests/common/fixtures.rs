//! Raw provider-update fixtures, built the same way the webhook receives
//! them: as Telegram Bot API JSON deserialized into `teloxide::types::Update`.

use serde_json::json;
use teloxide::types::Update;

fn from_value(value: serde_json::Value) -> Update {
    serde_json::from_value(value).expect("fixture update must deserialize")
}

fn user_json(user_id: i64) -> serde_json::Value {
    json!({
        "id": user_id,
        "is_bot": false,
        "first_name": "Test",
        "language_code": "en"
    })
}

fn chat_json(chat_id: i64) -> serde_json::Value {
    json!({ "id": chat_id, "type": "private", "first_name": "Test" })
}

/// Plain text (or command) message.
pub fn message_update(chat_id: i64, user_id: i64, text: &str) -> Update {
    from_value(json!({
        "update_id": 1,
        "message": {
            "message_id": 100,
            "date": 1700000000,
            "chat": chat_json(chat_id),
            "from": user_json(user_id),
            "text": text
        }
    }))
}

/// Callback-query press with the triggering message attached.
pub fn callback_update(chat_id: i64, user_id: i64, data: &str) -> Update {
    from_value(json!({
        "update_id": 2,
        "callback_query": {
            "id": "cb-1",
            "from": user_json(user_id),
            "message": {
                "message_id": 55,
                "date": 1700000000,
                "chat": chat_json(chat_id),
                "text": "menu"
            },
            "chat_instance": "ci-1",
            "data": data
        }
    }))
}

/// Callback-query press whose original message is gone (no chat to reply to).
pub fn callback_update_without_message(user_id: i64, data: &str) -> Update {
    from_value(json!({
        "update_id": 3,
        "callback_query": {
            "id": "cb-2",
            "from": user_json(user_id),
            "chat_instance": "ci-2",
            "data": data
        }
    }))
}

/// Mini-app webform submission.
pub fn webapp_update(chat_id: i64, user_id: i64, payload: &serde_json::Value) -> Update {
    from_value(json!({
        "update_id": 4,
        "message": {
            "message_id": 101,
            "date": 1700000000,
            "chat": chat_json(chat_id),
            "from": user_json(user_id),
            "web_app_data": {
                "data": payload.to_string(),
                "button_text": "Submit"
            }
        }
    }))
}

pub fn photo_update(chat_id: i64, user_id: i64) -> Update {
    from_value(json!({
        "update_id": 5,
        "message": {
            "message_id": 102,
            "date": 1700000000,
            "chat": chat_json(chat_id),
            "from": user_json(user_id),
            "photo": [{
                "file_id": "photo-file",
                "file_unique_id": "photo-unique",
                "width": 100,
                "height": 100
            }]
        }
    }))
}

pub fn document_update(chat_id: i64, user_id: i64) -> Update {
    from_value(json!({
        "update_id": 6,
        "message": {
            "message_id": 103,
            "date": 1700000000,
            "chat": chat_json(chat_id),
            "from": user_json(user_id),
            "document": {
                "file_id": "doc-file",
                "file_unique_id": "doc-unique",
                "file_name": "price-list.pdf"
            }
        }
    }))
}

pub fn location_update(chat_id: i64, user_id: i64) -> Update {
    from_value(json!({
        "update_id": 7,
        "message": {
            "message_id": 104,
            "date": 1700000000,
            "chat": chat_json(chat_id),
            "from": user_json(user_id),
            "location": { "latitude": 55.75, "longitude": 37.61 }
        }
    }))
}

pub fn contact_update(chat_id: i64, user_id: i64) -> Update {
    from_value(json!({
        "update_id": 8,
        "message": {
            "message_id": 105,
            "date": 1700000000,
            "chat": chat_json(chat_id),
            "from": user_json(user_id),
            "contact": {
                "phone_number": "+79990001122",
                "first_name": "Test",
                "user_id": user_id
            }
        }
    }))
}

pub fn voice_update(chat_id: i64, user_id: i64) -> Update {
    from_value(json!({
        "update_id": 9,
        "message": {
            "message_id": 106,
            "date": 1700000000,
            "chat": chat_json(chat_id),
            "from": user_json(user_id),
            "voice": {
                "file_id": "voice-file",
                "file_unique_id": "voice-unique",
                "duration": 3
            }
        }
    }))
}

/// An update kind the platform does not handle (edited message).
pub fn edited_message_update(chat_id: i64, user_id: i64) -> Update {
    from_value(json!({
        "update_id": 10,
        "edited_message": {
            "message_id": 107,
            "date": 1700000000,
            "edit_date": 1700000100,
            "chat": chat_json(chat_id),
            "from": user_json(user_id),
            "text": "edited"
        }
    }))
}
