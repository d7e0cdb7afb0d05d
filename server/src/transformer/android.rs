//! Android transformer variant (`/androidV1`) and the Home Assistant Android
//! quirk subset shared with the legacy variant.

use serde_json::{json, Map, Value};

use crate::models::NotificationRequest;

use super::common::{is_home_assistant_android, Builder};
use super::json_path as jp;

pub const ANALYTICS_LABEL: &str = "androidV1Notification";
const PASSTHROUGH_KEYS: &[&str] = &["android", "data"];

/// Fixed allow-list of recognized Android notification keys: each
/// present key is stringified and copied to `data.<key>` unchanged.
const RECOGNIZED_NOTIFICATION_KEYS: &[&str] = &[
    "icon", "color", "sound", "tag", "channel", "ticker", "sticky", "eventTime", "localOnly",
    "notificationPriority", "defaultSound", "defaultVibrateTimings", "defaultLightSettings",
    "vibrateTimings", "visibility", "notificationCount", "lightSettings", "image", "timeout",
    "importance", "subject", "group", "icon_url", "ledColor", "vibrationPattern", "persistent",
    "chronometer", "when", "alert_once", "intent_class_name", "notification_icon",
    "ble_advertise", "ble_transmit", "video", "high_accuracy_update_interval", "package_name",
    "tts_text", "media_stream", "command", "intent_package_name", "intent_action",
    "intent_extras", "media_command", "media_package_name", "intent_uri", "intent_type",
    "ble_uuid", "ble_major", "ble_minor", "confirmation", "app_lock_enabled",
    "app_lock_timeout", "home_bypass_enabled", "car_ui", "ble_measured_power", "progress",
    "progress_max", "progress_indeterminate", "bodyLocKey", "bodyLocArgs", "titleLocKey",
    "titleLocArgs", "clickAction", "when_relative",
];

/// `req.message` values that repurpose the notification into a silent
/// control message and disable rate-limit accounting.
const COMMAND_MESSAGES: &[&str] = &[
    "request_location_update",
    "clear_notification",
    "remove_channel",
    "command_dnd",
    "command_ringer_mode",
    "command_broadcast_intent",
    "command_volume_level",
    "command_screen_on",
    "command_bluetooth",
    "command_high_accuracy_mode",
    "command_activity",
    "command_app_lock",
    "command_webview",
    "command_media",
    "command_update_sensors",
    "command_ble_transmitter",
    "command_persistent_connection",
    "command_stop_tts",
    "command_auto_screen_brightness",
    "command_screen_brightness_level",
    "command_screen_off_timeout",
    "command_flashlight",
];

pub fn build(req: &NotificationRequest) -> (bool, Value) {
    let mut builder = Builder::new(ANALYTICS_LABEL);
    builder.seed(req);

    let data = req
        .data
        .as_ref()
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    builder.passthrough(&data, PASSTHROUGH_KEYS);

    if is_home_assistant_android(&req.registration_info.app_id) {
        apply_home_assistant_android(&mut builder, req, &data);
    }

    builder.finish()
}

/// Shared by the Android variant and the legacy variant's HA-android quirk
/// subset.
pub fn apply_home_assistant_android(
    builder: &mut Builder,
    req: &NotificationRequest,
    data: &Map<String, Value>,
) {
    apply_actions(builder, data);

    if let Some(ttl) = data.get("ttl") {
        jp::set(&mut builder.payload, &["android"], "ttl", ttl.clone());
    }
    if let Some(priority) = data.get("priority") {
        jp::set(&mut builder.payload, &["android"], "priority", priority.clone());
    }

    for key in RECOGNIZED_NOTIFICATION_KEYS {
        if let Some(value) = data.get(*key) {
            jp::set(&mut builder.payload, &["data"], key, stringify_value(value));
        }
    }

    if let Some(message) = &req.message {
        if COMMAND_MESSAGES.contains(&message.as_str()) {
            builder.update_rate_limits = false;
        }
    }

    reflect_to_data(builder, req);
}

/// Always reflects `message`, `title`, and `registration_info.webhook_id`
/// into `data`.
fn reflect_to_data(builder: &mut Builder, req: &NotificationRequest) {
    if let Some(message) = &req.message {
        jp::set(&mut builder.payload, &["data"], "message", json!(message));
    }
    if let Some(title) = &req.title {
        jp::set(&mut builder.payload, &["data"], "title", json!(title));
    }
    if let Some(webhook_id) = &req.registration_info.webhook_id {
        jp::set(&mut builder.payload, &["data"], "webhook_id", json!(webhook_id));
    }
}

fn apply_actions(builder: &mut Builder, data: &Map<String, Value>) {
    let actions = match data.get("actions").and_then(Value::as_array) {
        Some(a) => a,
        None => return,
    };

    for (zero_based, action) in actions.iter().enumerate() {
        let i = zero_based + 1;
        let Some(action) = action.as_object() else {
            continue;
        };
        for field in ["key", "title", "uri", "behavior"] {
            if let Some(value) = action.get(field) {
                let data_key = format!("action_{i}_{field}");
                jp::set(&mut builder.payload, &["data"], &data_key, value.clone());
            }
        }
    }
}

/// Each recognized key is "stringified and copied" — strings pass
/// through unchanged, everything else renders via its JSON text form.
fn stringify_value(value: &Value) -> Value {
    match value {
        Value::String(s) => json!(s),
        other => json!(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistrationInfo;

    fn req(message: Option<&str>, data: Value) -> NotificationRequest {
        NotificationRequest {
            push_token: "abc:1".into(),
            message: message.map(str::to_string),
            title: None,
            registration_info: RegistrationInfo {
                app_id: "io.homeassistant.companion.android".into(),
                app_version: None,
                os_version: None,
                webhook_id: Some("wh1".into()),
            },
            data: Some(data),
        }
    }

    #[test]
    fn actions_are_flattened_with_one_based_index() {
        let (_, payload) = build(&req(
            Some("hi"),
            json!({"actions": [{"key": "k1", "title": "t1", "uri": "u1"}]}),
        ));
        assert_eq!(payload["data"]["action_1_key"], json!("k1"));
        assert_eq!(payload["data"]["action_1_title"], json!("t1"));
        assert_eq!(payload["data"]["action_1_uri"], json!("u1"));
        assert!(payload["data"].get("action_1_behavior").is_none());
    }

    #[test]
    fn ttl_and_priority_go_to_android_subtree() {
        let (_, payload) = build(&req(Some("hi"), json!({"ttl": 30, "priority": "high"})));
        assert_eq!(payload["android"]["ttl"], json!(30));
        assert_eq!(payload["android"]["priority"], json!("high"));
    }

    #[test]
    fn command_message_disables_rate_limit_accounting() {
        let (update, _) = build(&req(Some("command_dnd"), json!({})));
        assert!(!update);
    }

    #[test]
    fn non_command_message_keeps_rate_limit_accounting() {
        let (update, _) = build(&req(Some("hello world"), json!({})));
        assert!(update);
    }

    #[test]
    fn message_title_and_webhook_id_always_reflected() {
        let mut r = req(Some("hi"), json!({}));
        r.title = Some("t".to_string());
        let (_, payload) = build(&r);
        assert_eq!(payload["data"]["message"], json!("hi"));
        assert_eq!(payload["data"]["title"], json!("t"));
        assert_eq!(payload["data"]["webhook_id"], json!("wh1"));
    }

    #[test]
    fn recognized_key_is_stringified_into_data() {
        let (_, payload) = build(&req(Some("hi"), json!({"notificationPriority": 2})));
        assert_eq!(payload["data"]["notificationPriority"], json!("2"));
    }
}
