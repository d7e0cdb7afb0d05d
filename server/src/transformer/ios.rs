//! iOS transformer variant (`/iOSV1`) and the Home Assistant iOS quirk
//! subset shared with the legacy variant.

use serde_json::{json, Map, Value};

use crate::models::NotificationRequest;

use super::common::{attachment_shorthand_content_type, is_home_assistant_ios, Builder};
use super::json_path as jp;

pub const ANALYTICS_LABEL: &str = "iosV1Notification";
const PASSTHROUGH_KEYS: &[&str] = &["apns", "data"];

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

    if is_home_assistant_ios(&req.registration_info.app_id) {
        apply_home_assistant_ios(&mut builder, req, &data);
    }

    builder.finish()
}

/// Shared by the iOS variant and the legacy variant's HA-iOS quirk subset.
/// Returns `true` if a command overload fired (caller should skip the
/// non-command data-key processing in that case — already handled here).
pub fn apply_home_assistant_ios(
    builder: &mut Builder,
    req: &NotificationRequest,
    data: &Map<String, Value>,
) -> bool {
    if let Some(message) = &req.message {
        if apply_command_overload(builder, message, data) {
            return true;
        }
    }
    apply_non_command_data(builder, req, data);
    false
}

fn clear_notification_and_replace_aps(builder: &mut Builder, aps: Value, command: &str) {
    if let Some(obj) = builder.payload.as_object_mut() {
        obj.remove("notification");
    }
    jp::set(&mut builder.payload, &["apns", "payload"], "aps", aps);
    jp::set(
        &mut builder.payload,
        &["apns", "payload", "homeassistant"],
        "command",
        json!(command),
    );
    builder.update_rate_limits = false;
}

/// Returns `true` if `message` matched one of the command overloads.
fn apply_command_overload(builder: &mut Builder, message: &str, data: &Map<String, Value>) -> bool {
    match message {
        "request_location_update" | "request_location_updates" => {
            clear_notification_and_replace_aps(
                builder,
                json!({"contentAvailable": true}),
                "request_location_update",
            );
            true
        }
        "clear_badge" => {
            clear_notification_and_replace_aps(builder, json!({"badge": 0}), "clear_badge");
            true
        }
        "clear_notification" => {
            clear_notification_and_replace_aps(builder, json!({}), "clear_notification");
            if let Some(tag) = data.get("tag") {
                jp::set(
                    &mut builder.payload,
                    &["apns", "payload", "homeassistant"],
                    "tag",
                    tag.clone(),
                );
            }
            if let Some(collapse_id) =
                jp::get(&builder.payload, &["apns", "headers"], "apns-collapse-id").cloned()
            {
                jp::set(
                    &mut builder.payload,
                    &["apns", "payload", "homeassistant"],
                    "collapseId",
                    collapse_id,
                );
                jp::remove(&mut builder.payload, &["apns", "headers"], "apns-collapse-id");
            }
            true
        }
        "update_complications" => {
            clear_notification_and_replace_aps(builder, json!({}), "update_complications");
            true
        }
        "update_widgets" => {
            clear_notification_and_replace_aps(builder, json!({}), "update_widgets");
            true
        }
        "delete_alert" => {
            if let Some(obj) = builder.payload.as_object_mut() {
                if let Some(notification) = obj.get_mut("notification").and_then(Value::as_object_mut) {
                    notification.remove("body");
                }
            }
            let aps_path = ["apns", "payload", "aps"];
            jp::remove(&mut builder.payload, &aps_path, "sound");
            let alert_path = ["apns", "payload", "aps", "alert"];
            for field in ["title", "subtitle", "body"] {
                jp::remove(&mut builder.payload, &alert_path, field);
            }
            builder.update_rate_limits = false;
            true
        }
        _ => false,
    }
}

fn apply_non_command_data(builder: &mut Builder, req: &NotificationRequest, data: &Map<String, Value>) {
    let aps_path = ["apns", "payload", "aps"];

    if let Some(subtitle) = data.get("subtitle") {
        jp::set(&mut builder.payload, &["apns", "payload", "aps", "alert"], "subtitle", subtitle.clone());
    }

    if let Some(Value::Object(push)) = data.get("push") {
        jp::shallow_merge_into(&mut builder.payload, &aps_path, push);
    }

    if let Some(actions) = data.get("actions") {
        jp::set(&mut builder.payload, &["apns", "payload"], "actions", actions.clone());
        builder.needs_category = true;
    }

    let sound = data.get("sound").or_else(|| data.get("push").and_then(|p| p.get("sound")));
    if let Some(sound) = sound {
        let normalized_sound = normalize_sound_for_os(sound, req.registration_info.os_version.as_deref());
        jp::set(&mut builder.payload, &aps_path, "sound", normalized_sound);
    }

    if let Some(entity_id) = data.get("entity_id") {
        jp::set(&mut builder.payload, &["apns", "payload"], "entity_id", entity_id.clone());
        builder.needs_category = true;
        builder.needs_mutable_content = true;
    }

    if let Some(action_data) = data.get("action_data") {
        jp::set(&mut builder.payload, &["apns", "payload"], "homeassistant", action_data.clone());
        builder.needs_category = true;
    }

    apply_attachment(builder, data);

    for key in ["url", "shortcut", "presentation_options"] {
        if let Some(value) = data.get(key) {
            jp::set(&mut builder.payload, &["apns", "payload"], key, value.clone());
        }
    }

    if let Some(Value::String(tag)) = data.get("tag") {
        jp::set(&mut builder.payload, &["apns", "headers"], "apns-collapse-id", json!(tag));
    }

    if let Some(Value::String(group)) = data.get("group") {
        jp::set(&mut builder.payload, &aps_path, "thread-id", json!(group));
    }
}

/// `os_version` starting with `10.15` (macOS Catalina apps reporting a
/// pre-normalization sound name) strips a filename extension from the sound.
fn normalize_sound_for_os(sound: &Value, os_version: Option<&str>) -> Value {
    let strip_extension = os_version.is_some_and(|v| v.starts_with("10.15"));
    if !strip_extension {
        return sound.clone();
    }
    match sound {
        Value::String(s) => json!(strip_sound_extension(s)),
        Value::Object(obj) => {
            let mut obj = obj.clone();
            if let Some(Value::String(name)) = obj.get("name") {
                let stripped = strip_sound_extension(name);
                obj.insert("name".to_string(), json!(stripped));
            }
            Value::Object(obj)
        }
        other => other.clone(),
    }
}

fn strip_sound_extension(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) => name[..idx].to_string(),
        None => name.to_string(),
    }
}

fn apply_attachment(builder: &mut Builder, data: &Map<String, Value>) {
    let mut attachment = data
        .get("attachment")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut touched = data.contains_key("attachment");

    for key in ["video", "image", "audio"] {
        if let Some(url) = data.get(key) {
            touched = true;
            if !attachment.contains_key("url") {
                attachment.insert("url".to_string(), url.clone());
            }
            if !attachment.contains_key("content-type") {
                if let Some(content_type) = attachment_shorthand_content_type(key) {
                    attachment.insert("content-type".to_string(), json!(content_type));
                }
            }
        }
    }

    if touched {
        jp::set(&mut builder.payload, &["apns", "payload"], "attachment", Value::Object(attachment));
        builder.needs_category = true;
        builder.needs_mutable_content = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistrationInfo;

    fn req(message: &str, data: Value) -> NotificationRequest {
        NotificationRequest {
            push_token: "abc:1".into(),
            message: Some(message.to_string()),
            title: None,
            registration_info: RegistrationInfo {
                app_id: "io.robbie.HomeAssistant".into(),
                app_version: None,
                os_version: None,
                webhook_id: None,
            },
            data: Some(data),
        }
    }

    #[test]
    fn clear_badge_overload() {
        let (update, payload) = build(&req("clear_badge", json!({})));
        assert!(!update);
        assert_eq!(payload["apns"]["payload"]["aps"]["badge"], json!(0.0));
        assert_eq!(
            payload["apns"]["payload"]["homeassistant"]["command"],
            json!("clear_badge")
        );
        assert!(payload.get("notification").is_none());
    }

    #[test]
    fn clear_notification_moves_collapse_id() {
        let mut data = json!({"tag": "t1"});
        data.as_object_mut()
            .unwrap()
            .insert("apns_headers".to_string(), json!({"apns-collapse-id": "abc"}));
        let (update, payload) = build(&req("clear_notification", data));
        assert!(!update);
        assert_eq!(
            payload["apns"]["payload"]["homeassistant"]["collapseId"],
            json!("abc")
        );
        assert_eq!(payload["apns"]["payload"]["homeassistant"]["tag"], json!("t1"));
        assert!(payload["apns"]["headers"].get("apns-collapse-id").is_none());
    }

    #[test]
    fn delete_alert_strips_alert_fields_but_keeps_structure() {
        let mut r = req("delete_alert", json!({}));
        r.title = Some("hi".to_string());
        let (update, payload) = build(&r);
        assert!(!update);
        assert!(payload["notification"].get("body").is_none());
        assert!(payload["apns"]["payload"]["aps"]
            .get("alert")
            .and_then(|a| a.get("title"))
            .is_none());
    }

    #[test]
    fn entity_id_sets_category_and_mutable_content() {
        let (update, payload) = build(&req("hello", json!({"entity_id": "light.kitchen"})));
        assert!(update);
        assert_eq!(payload["apns"]["payload"]["aps"]["category"], json!("DYNAMIC"));
        assert_eq!(payload["apns"]["payload"]["aps"]["mutableContent"], json!(true));
    }

    #[test]
    fn sound_none_is_removed() {
        let (_, payload) = build(&req("hello", json!({"sound": "None"})));
        assert!(payload["apns"]["payload"]["aps"].get("sound").is_none());
    }
}
